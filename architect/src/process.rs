use std::{ffi::OsStr, fmt, io, io::Write, num::NonZeroI32, process, thread};

use log::debug;

/// A [`process::Command`] whose failures remember which command failed.
pub struct Command(process::Command);

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Command {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self(process::Command::new(program))
    }

    pub fn args<'a, I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = &'a OsStr>,
    {
        self.0.args(args);
        self
    }

    fn fail(self, kind: impl Into<ErrorKind>) -> Error {
        Error {
            command: self,
            kind: kind.into(),
        }
    }

    /// Runs the command with inherited stdio and requires it to succeed.
    pub fn status(mut self) -> Result<()> {
        debug!("running `{command:?}`...", command = &self.0);

        match self.0.status() {
            Ok(status) => require_success(self, status).map(|_| ()),
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Runs the command with `input` written to its standard input, captures its output and
    /// requires it to succeed. Used to hand secrets to a command without putting them on the
    /// command line.
    pub fn output_with_input(mut self, input: &[u8]) -> Result<Output> {
        debug!("capturing `{command:?}` with input...", command = &self.0);

        let spawned = self
            .0
            .stdin(process::Stdio::piped())
            .stdout(process::Stdio::piped())
            .stderr(process::Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(error) => return Err(self.fail(error)),
        };

        // Stdin is written from another thread while the output pipes are drained. Dropping it
        // closes the pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            thread::spawn(move || stdin.write_all(&input))
        });

        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(error) => return Err(self.fail(error)),
        };

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(error)) => return Err(self.fail(error)),
                Err(_) => return Err(self.fail(io::Error::other("writing to stdin panicked"))),
            }
        }

        let status = output.status;
        require_success(self, status).map(|command| Output { command, output })
    }
}

fn require_success(command: Command, status: process::ExitStatus) -> Result<Command> {
    if status.success() {
        Ok(command)
    } else {
        Err(command.fail(ErrorKind::NonZeroExitStatus(
            status.code().and_then(NonZeroI32::new),
        )))
    }
}

#[derive(Debug)]
pub struct Output {
    pub command: Command,
    pub output: process::Output,
}

impl std::ops::Deref for Output {
    type Target = process::Output;

    fn deref(&self) -> &Self::Target {
        &self.output
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    Io(io::ErrorKind),
    NonZeroExitStatus(Option<NonZeroI32>),
}

impl From<io::Error> for ErrorKind {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            other => ErrorKind::Io(other),
        }
    }
}

#[derive(Debug)]
pub struct Error {
    pub command: Command,
    pub kind: ErrorKind,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to run `{command:?}`: ", command = &self.command.0)?;
        let program = self.command.0.get_program().to_string_lossy();
        match self.kind {
            ErrorKind::NotFound => {
                write!(f, "the `{program}` command is required but not available on your system, please install it")
            }
            ErrorKind::PermissionDenied => {
                write!(f, "the `{program}` command is available but does not have the right permissions, please make sure the binary is executable")
            }
            ErrorKind::Io(kind) => write!(f, "{kind}"),
            ErrorKind::NonZeroExitStatus(code) => {
                if let Some(code) = code {
                    write!(f, "exited with non-zero exit code `{code}`")
                } else {
                    write!(f, "did not run successfully")
                }
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Creates a new [`Command`] and supplies the provided arguments, if any, while calling
/// [`std::convert::AsRef::as_ref`] on each.
macro_rules! command {
    ($program:expr $(,)?) => {
        $crate::process::Command::new($program)
    };
    ($program:expr, $($arg:expr),+ $(,)?) => {
        $crate::process::Command::new($program).args([
            $(::std::convert::AsRef::<::std::ffi::OsStr>::as_ref(&$arg),)+
        ])
    };
}

pub(crate) use command;
