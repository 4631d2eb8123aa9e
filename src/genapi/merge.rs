//! Channel list merging

use std::collections::HashMap;

use tracing::debug;

use crate::models::ChannelList;

/// Flatten `lists` into one list, keeping the first channel seen for each
/// non-empty `meta.id`.
///
/// Lists and channels are visited in the order given. Later duplicates are
/// dropped with a debug log; channels without an id are always kept. The
/// merged list carries no raw payload.
pub fn merge_channel_lists<I>(lists: I) -> ChannelList
where
    I: IntoIterator<Item = ChannelList>,
{
    let mut merged = ChannelList::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for channel in list.channels {
            if !channel.meta.id.is_empty() {
                if let Some(&index) = seen.get(&channel.meta.id) {
                    debug!(
                        id = %channel.meta.id,
                        title = %channel.title,
                        existing_title = %merged.channels[index].title,
                        "Detected duplicate channel, not adding it"
                    );
                    continue;
                }
                seen.insert(channel.meta.id.clone(), merged.channels.len());
            }
            merged.channels.push(channel);
        }
    }

    merged
}
