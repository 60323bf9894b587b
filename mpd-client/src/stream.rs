use futures_core::Stream;
use mpd_rs_protocol::IdleEvents;

use crate::client::MpdConnection;
use crate::error::MpdError;

/// Turn a connection's idle notifications into a [`Stream`] of event masks.
///
/// Each iteration enters idle mode and waits for the daemon to report a
/// change. The stream yields one non-empty mask per notification and ends
/// after the first error. Dropping the stream leaves the connection idle;
/// the next command on it leaves idle mode as usual.
pub fn idle_events(
    conn: &mut MpdConnection,
) -> impl Stream<Item = Result<IdleEvents, MpdError>> + '_ {
    async_stream::try_stream! {
        loop {
            conn.idle().await?;
            let events = conn.wait_idle().await?;
            if !events.is_empty() {
                yield events;
            }
        }
    }
}
