//! SSH exec channels.

use bytes::Bytes;
use russh::client::Msg;
use russh::{Channel, ChannelMsg, Sig};

use crate::result::{ExitInfo, OutputChunk};
use crate::transport::{ChannelEvent, CommandChannel};

/// SSH extended data type for stderr.
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// A russh session channel running one command.
///
/// Exit status and exit signal arrive as separate messages before the
/// channel closes; they are held until `Close` and reported together.
pub struct SshCommandChannel {
    channel: Channel<Msg>,
    exit: ExitInfo,
    closed: bool,
}

impl std::fmt::Debug for SshCommandChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshCommandChannel")
            .field("channel_id", &self.channel.id())
            .field("exit", &self.exit)
            .field("closed", &self.closed)
            .finish()
    }
}

impl SshCommandChannel {
    pub(crate) fn new(channel: Channel<Msg>) -> Self {
        Self {
            channel,
            exit: ExitInfo::default(),
            closed: false,
        }
    }
}

impl CommandChannel for SshCommandChannel {
    async fn next_event(&mut self) -> Option<ChannelEvent> {
        if self.closed {
            return None;
        }

        loop {
            let Some(msg) = self.channel.wait().await else {
                // The connection went away before the channel closed.
                self.closed = true;
                return None;
            };

            match msg {
                ChannelMsg::Data { data } => {
                    return Some(ChannelEvent::Output(OutputChunk::stdout(
                        Bytes::copy_from_slice(&data),
                    )));
                }
                ChannelMsg::ExtendedData { data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
                    return Some(ChannelEvent::Output(OutputChunk::stderr(
                        Bytes::copy_from_slice(&data),
                    )));
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    self.exit.exit_code = Some(exit_status);
                }
                ChannelMsg::ExitSignal {
                    signal_name,
                    core_dumped,
                    error_message,
                    ..
                } => {
                    tracing::debug!(
                        signal = ?signal_name,
                        core_dumped,
                        error = %error_message,
                        "Remote command terminated by signal"
                    );
                    self.exit.signal = Some(signal_label(&signal_name));
                }
                ChannelMsg::Close => {
                    self.closed = true;
                    return Some(ChannelEvent::Closed(std::mem::take(&mut self.exit)));
                }
                _ => {}
            }
        }
    }
}

/// Signal name without the `SIG` prefix, as sent on the wire.
fn signal_label(signal: &Sig) -> String {
    match signal {
        Sig::Custom(name) => name.clone(),
        other => format!("{other:?}"),
    }
}
