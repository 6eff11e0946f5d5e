use std::io::{self, Read};

use tracing::{debug, info, warn};
use workerpipe::messages::{
    decode_json, encode_json, ConfigureResult, LogLevel, LogRecord, MessageError,
};
use workerpipe_frame::{Channel, FrameError, MessageReceiver, MessageSender, MessageType};

use crate::cmd::WorkerArgs;
use crate::exit::{frame_error, message_error, CliResult, SUCCESS};

/// What the loop does once the current payload has been consumed.
enum Action {
    Configure(Result<serde_json::Value, MessageError>),
    Shutdown,
    Continue,
}

pub fn run(args: WorkerArgs) -> CliResult<i32> {
    let mut channel = Channel::new(io::stdin().lock(), io::stdout().lock());
    info!(pid = std::process::id(), "worker started");
    serve(&mut channel, &args.logger)
}

/// Answer supervisor messages until SHUTDOWN or end of stream.
pub fn serve<C>(channel: &mut C, logger: &str) -> CliResult<i32>
where
    C: MessageReceiver + MessageSender,
{
    loop {
        let action = {
            let (msg_type, mut payload) = match channel.receive_message() {
                Ok(message) => message,
                Err(FrameError::ConnectionClosed) => {
                    info!("supervisor closed the channel");
                    return Ok(SUCCESS);
                }
                Err(err) => return Err(frame_error("receive failed", err)),
            };

            match msg_type {
                MessageType::CONFIGURE => Action::Configure(decode_json(&mut payload)),
                MessageType::SHUTDOWN => {
                    drain(&mut payload)?;
                    Action::Shutdown
                }
                other => {
                    let discarded = drain(&mut payload)?;
                    warn!(msg_type = %other, size = discarded, "ignoring unexpected message");
                    Action::Continue
                }
            }
        };

        match action {
            Action::Configure(document) => configure(channel, logger, document)?,
            Action::Shutdown => {
                info!("shutdown requested");
                return Ok(SUCCESS);
            }
            Action::Continue => {}
        }
    }
}

fn configure<C: MessageSender>(
    channel: &mut C,
    logger: &str,
    document: Result<serde_json::Value, MessageError>,
) -> CliResult<()> {
    let (result, record) = match document {
        Ok(serde_json::Value::Object(fields)) => (
            ConfigureResult::ok(),
            LogRecord::new(
                LogLevel::Info,
                format!("configured with {} setting(s)", fields.len()),
            ),
        ),
        Ok(_) => {
            let message = "configuration must be a JSON object";
            (
                ConfigureResult::failed(message),
                LogRecord::new(LogLevel::Error, message),
            )
        }
        Err(MessageError::Io(err)) => {
            return Err(frame_error("receive failed", FrameError::Io(err)));
        }
        Err(err) => {
            let message = err.to_string();
            (
                ConfigureResult::failed(message.clone()),
                LogRecord::new(LogLevel::Error, message),
            )
        }
    };
    debug!(ok = result.is_ok(), "answering configure");

    send_json(channel, MessageType::CONFIGURE_RESULT, &result)?;
    send_json(channel, MessageType::LOG, &record.with_logger(logger))
}

fn send_json<C: MessageSender, T: serde::Serialize>(
    channel: &mut C,
    msg_type: MessageType,
    body: &T,
) -> CliResult<()> {
    let payload = encode_json(body).map_err(|err| message_error("encode failed", err))?;
    channel
        .send_message(msg_type, &payload)
        .map_err(|err| frame_error("send failed", err))
}

fn drain(payload: &mut impl Read) -> CliResult<u64> {
    io::copy(payload, &mut io::sink()).map_err(|err| frame_error("receive failed", err.into()))
}
