use std::fs::File;
use std::io::{self, BufReader, Read};

use workerpipe_frame::{FrameConfig, FrameError, FrameReceiver};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(BufReader::new(File::open(path).map_err(|err| {
            io_error(&format!("failed opening {}", path.display()), err)
        })?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut config = FrameConfig::default();
    if let Some(max) = args.max_payload {
        config.max_payload_size = max;
    }

    let mut receiver = FrameReceiver::with_config(input, config);
    let printed = decode_all(&mut receiver, args.count, |msg_type, payload| {
        print_message(msg_type, payload, format)
    })?;

    tracing::debug!(frames = printed, "decode finished");
    Ok(SUCCESS)
}

/// Decode frames until the input ends at a frame boundary or `limit` frames
/// have been handed to `emit`.
fn decode_all<R, F>(
    receiver: &mut FrameReceiver<R>,
    limit: Option<usize>,
    mut emit: F,
) -> CliResult<usize>
where
    R: Read,
    F: FnMut(workerpipe_frame::MessageType, &[u8]),
{
    let mut printed = 0usize;
    while limit.is_none_or(|count| printed < count) {
        let frame = match receiver.recv_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("decode failed", err)),
        };
        emit(frame.msg_type, frame.payload.as_ref());
        printed = printed.saturating_add(1);
    }
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use workerpipe_frame::{FrameSender, MessageType};

    use super::*;
    use crate::exit::DATA_INVALID;

    fn wire(frames: &[(MessageType, &[u8])]) -> Vec<u8> {
        let mut out = Vec::<u8>::new();
        let mut sender = FrameSender::new(&mut out);
        for (msg_type, payload) in frames {
            sender.send_message(*msg_type, payload).unwrap();
        }
        out
    }

    #[test]
    fn decodes_until_end_of_stream() {
        let bytes = wire(&[(MessageType::CONFIGURE, b"{}"), (MessageType::new(42), b"")]);
        let mut receiver = FrameReceiver::new(Cursor::new(bytes));

        let mut seen = Vec::new();
        let n = decode_all(&mut receiver, None, |t, p| seen.push((t, p.to_vec()))).unwrap();

        assert_eq!(n, 2);
        assert_eq!(
            seen,
            vec![
                (MessageType::CONFIGURE, b"{}".to_vec()),
                (MessageType::new(42), Vec::new()),
            ]
        );
    }

    #[test]
    fn stops_after_count() {
        let bytes = wire(&[(MessageType::LOG, b"a"), (MessageType::LOG, b"b")]);
        let mut receiver = FrameReceiver::new(Cursor::new(bytes));

        let n = decode_all(&mut receiver, Some(1), |_, _| {}).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn truncated_input_is_data_invalid() {
        let mut receiver = FrameReceiver::new(Cursor::new(vec![1u8, 0, 0, 0, 9]));
        let err = decode_all(&mut receiver, None, |_, _| {}).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
