use futures::{Stream, StreamExt};
use reqwest::Response;
use std::pin::Pin;

use super::buffering::CircularLineBuffer;
use crate::error::ProviderError;

/// Strategy for turning SSE `data:` payloads into typed events
pub trait SseLineParser: Send {
    type Event: Send + 'static;

    fn parse_data_line(&self, data: &str) -> Result<Vec<Self::Event>, ProviderError>;

    fn is_done_marker(&self, data: &str) -> bool {
        data == "[DONE]"
    }
}

/// Read an SSE response body line by line, applying `parser` to each data line
///
/// `event:`/`id:` lines and blank separators are skipped; the stream ends at
/// the done marker or when the body ends.
pub fn parse_sse_stream<P: SseLineParser + 'static>(
    response: Response,
    parser: P,
) -> Pin<Box<dyn Stream<Item = Result<P::Event, ProviderError>> + Send>> {
    let stream = response.bytes_stream();

    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(stream);
        let mut buffer = CircularLineBuffer::with_capacity(4096);

        'read: while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(&bytes);

                    while let Some(line_result) = buffer.next_line() {
                        let line = match line_result {
                            Ok(line) => line,
                            Err(e) => {
                                yield Err(e);
                                continue;
                            }
                        };

                        let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
                            continue;
                        };

                        if parser.is_done_marker(data) {
                            break 'read;
                        }

                        match parser.parse_data_line(data) {
                            Ok(events) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            Err(e) => yield Err(e),
                        }
                    }
                }
                Err(e) => {
                    yield Err(ProviderError::from(e));
                    break;
                }
            }
        }
    })
}
