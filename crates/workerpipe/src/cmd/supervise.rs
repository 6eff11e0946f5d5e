use std::fs;
use std::io::Read;

use tracing::warn;
use workerpipe::messages::{decode_json, ConfigureResult, LogRecord};
use workerpipe_frame::{FrameError, MessageReceiver, MessageSender, MessageType};

use crate::cmd::SuperviseArgs;
use crate::exit::{
    frame_error, io_error, message_error, CliError, CliResult, TRANSPORT_ERROR, USAGE,
};
use crate::logging::forward_record;
use crate::output::{print_message, OutputFormat};

#[cfg(unix)]
pub fn run(args: SuperviseArgs, format: OutputFormat) -> CliResult<i32> {
    unix::run(args, format)
}

#[cfg(not(unix))]
pub fn run(_args: SuperviseArgs, _format: OutputFormat) -> CliResult<i32> {
    Err(CliError::new(
        USAGE,
        "supervise needs anonymous pipes and is only available on unix",
    ))
}

/// The CONFIGURE document, checked to be JSON before any worker is started.
fn load_config(args: &SuperviseArgs) -> CliResult<Vec<u8>> {
    let document = match &args.config_file {
        Some(path) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        None => args.config.as_bytes().to_vec(),
    };
    serde_json::from_slice::<serde_json::Value>(&document)
        .map_err(|err| CliError::new(USAGE, format!("configuration is not valid JSON: {err}")))?;
    Ok(document)
}

#[cfg(unix)]
mod unix {
    use std::process::{Child, Command, Stdio};

    use tracing::{debug, info, warn};
    use workerpipe_frame::Channel;

    use super::{converse, load_config, Outcome};
    use crate::cmd::SuperviseArgs;
    use crate::exit::{
        frame_error, io_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS, USAGE,
    };
    use crate::output::OutputFormat;

    pub fn run(args: SuperviseArgs, format: OutputFormat) -> CliResult<i32> {
        let config = load_config(&args)?;
        let (program, program_args) = args
            .command
            .split_first()
            .ok_or_else(|| CliError::new(USAGE, "missing worker command"))?;

        let mut child = Command::new(program)
            .args(program_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|err| io_error(&format!("failed to spawn {program}"), err))?;
        let pid = child.id();
        info!(pid, program = %program, "worker spawned");

        let mut channel = match Channel::for_child(&mut child) {
            Ok(channel) => channel,
            Err(err) => {
                reap(&mut child);
                return Err(frame_error("attach failed", err));
            }
        };

        let outcome = match converse(&mut channel, pid, &config, format) {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(close_err) = channel.close() {
                    warn!(pid, error = %close_err, "failed to close channel");
                }
                reap(&mut child);
                return Err(err);
            }
        };

        channel
            .close()
            .map_err(|err| frame_error("close failed", err))?;
        let status = child
            .wait()
            .map_err(|err| io_error("failed waiting for worker", err))?;
        debug!(pid, %status, "worker exited");

        if let Outcome::Rejected(message) = outcome {
            return Err(CliError::new(
                DATA_INVALID,
                format!("worker rejected configuration: {message}"),
            ));
        }
        if !status.success() {
            return Err(CliError::new(FAILURE, format!("worker exited with {status}")));
        }
        Ok(SUCCESS)
    }

    /// Kill and wait for a worker whose conversation failed.
    fn reap(child: &mut Child) {
        if let Err(err) = child.kill() {
            debug!(pid = child.id(), error = %err, "kill failed");
        }
        match child.wait() {
            Ok(status) => debug!(pid = child.id(), %status, "worker reaped"),
            Err(err) => warn!(pid = child.id(), error = %err, "failed waiting for worker"),
        }
    }
}

/// How the worker answered CONFIGURE.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Accepted,
    Rejected(String),
}

/// Send CONFIGURE, relay everything the worker says, and send SHUTDOWN once
/// the configuration has been answered. Returns when the worker closes its
/// end of the channel.
fn converse<C>(
    channel: &mut C,
    pid: u32,
    config: &[u8],
    format: OutputFormat,
) -> CliResult<Outcome>
where
    C: MessageReceiver + MessageSender,
{
    channel
        .send_message(MessageType::CONFIGURE, config)
        .map_err(|err| frame_error("send failed", err))?;

    let mut outcome = None;
    loop {
        let (msg_type, body) = {
            let (msg_type, mut payload) = match channel.receive_message() {
                Ok(message) => message,
                Err(FrameError::ConnectionClosed) => break,
                Err(err) => return Err(frame_error("receive failed", err)),
            };
            let mut body = Vec::new();
            payload
                .read_to_end(&mut body)
                .map_err(|err| frame_error("receive failed", err.into()))?;
            (msg_type, body)
        };

        match msg_type {
            MessageType::LOG => match decode_json::<LogRecord>(&mut body.as_slice()) {
                Ok(record) => forward_record(pid, &record),
                Err(err) => warn!(pid, error = %err, "unreadable log record"),
            },
            MessageType::CONFIGURE_RESULT => {
                print_message(msg_type, &body, format);
                if outcome.is_some() {
                    warn!(pid, "ignoring repeated configure result");
                    continue;
                }

                let result: ConfigureResult = decode_json(&mut body.as_slice())
                    .map_err(|err| message_error("bad configure result", err))?;
                outcome = Some(match result.into_result() {
                    Ok(()) => Outcome::Accepted,
                    Err(message) => {
                        warn!(pid, error = %message, "worker rejected configuration");
                        Outcome::Rejected(message)
                    }
                });
                if let Err(err) = channel.send_message(MessageType::SHUTDOWN, &[]) {
                    warn!(pid, error = %err, "failed to send shutdown");
                }
            }
            other => print_message(other, &body, format),
        }
    }

    outcome.ok_or_else(|| {
        CliError::new(TRANSPORT_ERROR, "worker exited before answering CONFIGURE")
    })
}
