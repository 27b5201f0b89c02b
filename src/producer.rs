//! Tag producer channel.
//!
//! The producer is an external process speaking a lock-step protocol: write
//! one path plus newline, flush, then read that path's whole group before the
//! next request. [`TagChannel`] is the seam the synchronizer drives;
//! [`PipeChannel`] implements it over any pair of byte streams and
//! [`CtagsProducer`] over a Universal Ctags child process in filter mode.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};

use camino::Utf8Path;

use crate::error::{IndexError, Result};
use crate::ingest::{self, TagGroup, FIELD_END, FIELD_SEP, GROUP_END};
use crate::paths;

/// Environment variable naming the producer executable.
pub const CTAGS_ENV: &str = "CTAGSPATH";

/// Executable searched on `PATH` when [`CTAGS_ENV`] is unset.
pub const DEFAULT_PROGRAM: &str = "ctags";

#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

/// Synchronous request/response access to a tag producer.
pub trait TagChannel {
    /// Send `path` and block until its group has been read.
    ///
    /// An incomplete group (stream ended before the terminator) is returned
    /// with `complete == false`; the caller decides how to fail.
    fn request(&mut self, path: &Utf8Path) -> Result<TagGroup>;
}

/// [`TagChannel`] over a reader/writer pair.
pub struct PipeChannel<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> PipeChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> TagChannel for PipeChannel<R, W> {
    fn request(&mut self, path: &Utf8Path) -> Result<TagGroup> {
        paths::ensure_single_line(path)?;

        writeln!(self.writer, "{}", path)
            .and_then(|_| self.writer.flush())
            .map_err(|e| IndexError::ProducerChannel(format!("write failed: {}", e)))?;

        ingest::read_group(&mut self.reader)
    }
}

/// Resolve the producer executable.
///
/// The `CTAGSPATH` environment variable wins over `ctags` on `PATH`.
pub fn locate_program() -> Result<PathBuf> {
    if let Some(program) = std::env::var_os(CTAGS_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(program));
    }
    which::which(DEFAULT_PROGRAM).map_err(|e| {
        IndexError::ProducerChannel(format!(
            "{} not found in PATH ({}); set {} to the Universal Ctags executable",
            DEFAULT_PROGRAM, e, CTAGS_ENV
        ))
    })
}

/// Custom output format asking the producer for the wire encoding.
pub fn xformat() -> String {
    const FIELDS: [(char, &str, &str); 17] = [
        ('T', "mark", "R"),
        ('T', "name", "N"),
        ('T', "pattern", "P"),
        ('T', "compact", "C"),
        ('I', "line", "n"),
        ('I', "endl", "e"),
        ('T', "language", "l"),
        ('T', "roles", "r"),
        ('T', "kind", "K"),
        ('T', "typeref", "t"),
        ('T', "signature", "S"),
        ('T', "access", "a"),
        ('T', "inherits", "i"),
        ('T', "implementation", "m"),
        ('T', "scopeKind", "p"),
        ('T', "scopeName", "s"),
        ('T', "extras", "E"),
    ];

    let mut format = String::new();
    for (type_char, key, directive) in FIELDS {
        format.push(FIELD_SEP);
        format.push_str(&format!("{}${}=%{}", type_char, key, directive));
        format.push(FIELD_END);
    }
    format
}

/// Full producer argument list: pass-through arguments first, then the
/// filter-mode options.
pub fn filter_args(extra_args: &[String], encoding: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = extra_args.to_vec();
    if encoding.is_some() {
        args.push("--output-encoding=UTF-8".to_string());
    }
    args.extend(
        [
            "-uxL",
            NULL_DEVICE,
            "--filter",
            "--fields=*",
            "--extras=*",
            "--pseudo-tags=",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(format!("--filter-terminator={}", GROUP_END));
    args.push(format!("--_xformat={}", xformat()));
    args
}

type ChildChannel = PipeChannel<BufReader<ChildStdout>, BufWriter<ChildStdin>>;

/// Universal Ctags running in filter mode.
pub struct CtagsProducer {
    child: Child,
    channel: Option<ChildChannel>,
    reaped: bool,
}

impl CtagsProducer {
    /// Start the producer with working directory `base`.
    ///
    /// # Errors
    /// [`IndexError::ProducerChannel`] when the process cannot be started.
    pub fn spawn(
        program: &Path,
        base: &Path,
        extra_args: &[String],
        encoding: Option<&str>,
    ) -> Result<Self> {
        let args = filter_args(extra_args, encoding);
        tracing::debug!(program = %program.display(), cwd = %base.display(), "starting tag producer");

        let mut child = Command::new(program)
            .args(&args)
            .current_dir(base)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                IndexError::ProducerChannel(format!("execute '{}' failed: {}", program.display(), e))
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(IndexError::ProducerChannel(
                "producer pipes unavailable".to_string(),
            ));
        };

        Ok(Self {
            child,
            channel: Some(PipeChannel::new(BufReader::new(stdout), BufWriter::new(stdin))),
            reaped: false,
        })
    }

    /// Close the request stream and wait for the process to exit.
    pub fn finish(mut self) -> Result<ExitStatus> {
        self.channel.take();
        let status = self.child.wait()?;
        self.reaped = true;
        if !status.success() {
            tracing::warn!(%status, "tag producer exited abnormally");
        }
        Ok(status)
    }
}

impl TagChannel for CtagsProducer {
    fn request(&mut self, path: &Utf8Path) -> Result<TagGroup> {
        match self.channel.as_mut() {
            Some(channel) => channel.request(path),
            None => Err(IndexError::ProducerChannel("producer already closed".to_string())),
        }
    }
}

impl Drop for CtagsProducer {
    fn drop(&mut self) {
        if !self.reaped {
            self.channel.take();
            let _ = self.child.wait();
        }
    }
}
