//! Parsers for `pactl` and `pacmd` text output.
//!
//! All of them expect the C locale.

use crate::switcher::{LiveStream, PlaybackStream, ServerEvent, StreamKind};

/// Returns the value of a `key = "value"` property line.
fn property<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.trim().strip_prefix(key)?.trim_start().strip_prefix('=')?;
    let value = rest.trim();
    Some(value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value))
}

/// Returns the value of a `Key: value` field line.
fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.trim().strip_prefix(key)?.strip_prefix(':').map(str::trim)
}

/// Returns the default sink named by `pactl info`.
#[must_use]
pub fn default_sink(info: &str) -> Option<&str> {
    info.lines()
        .find_map(|line| field(line, "Default Sink"))
        .filter(|sink| !sink.is_empty())
}

/// Extracts the device address from a Bluetooth sink name.
///
/// `bluez_sink.00_1B_66_AA_BB_CC.a2dp_sink` yields `00_1B_66_AA_BB_CC`.
#[must_use]
pub fn bluetooth_address<'a>(sink: &'a str, sink_prefix: &str) -> Option<&'a str> {
    let rest = sink.trim().strip_prefix(sink_prefix)?;
    let address = rest.split_once('.').map_or(rest, |(address, _)| address);
    (!address.is_empty()).then_some(address)
}

/// Returns the active profile of `card` from `pactl list cards`.
///
/// The outer `None` means the card is not listed.
#[must_use]
pub fn active_profile(listing: &str, card: &str) -> Option<Option<String>> {
    let mut in_card = false;
    let mut found = false;

    for line in listing.lines() {
        if line.starts_with("Card #") {
            if found {
                return Some(None);
            }
            in_card = false;
        } else if let Some(name) = field(line, "Name") {
            in_card = name == card;
            found |= in_card;
        } else if in_card && let Some(profile) = field(line, "Active Profile") {
            return Some(Some(profile.to_string()));
        }
    }

    found.then_some(None)
}

/// Returns the first channel's raw volume from `pactl get-sink-volume`.
///
/// ```text
/// Volume: front-left: 26214 /  40% / -23.88 dB,   front-right: 26214 /  40% / -23.88 dB
/// ```
#[must_use]
pub fn first_volume(output: &str) -> Option<u32> {
    let line = output.lines().find_map(|line| line.trim().strip_prefix("Volume:"))?;
    let first_channel = line.split(',').next()?;
    let (_, value) = first_channel.split_once(':')?;
    value.split('/').next()?.trim().parse().ok()
}

/// Parses `pactl list sink-inputs` or `pactl list source-outputs`.
#[must_use]
pub fn live_streams(listing: &str) -> Vec<LiveStream> {
    let mut streams: Vec<LiveStream> = Vec::new();

    for line in listing.lines() {
        if !line.starts_with(char::is_whitespace) {
            if let Some((_, id)) = line.rsplit_once('#')
                && let Ok(id) = id.trim().parse()
            {
                streams.push(LiveStream { id, application: None });
            }
        } else if let Some(name) = property(line, "application.name")
            && let Some(stream) = streams.last_mut()
        {
            stream.application = Some(name.to_string());
        }
    }

    streams
}

/// Parses `pacmd list-sink-inputs`, keeping only unmuted streams.
///
/// A stream is resumable when its flags contain `START_CORKED`.
#[must_use]
pub fn unmuted_playback(listing: &str) -> Vec<PlaybackStream> {
    #[derive(Default)]
    struct Block {
        id: u32,
        application: Option<String>,
        muted: bool,
        resumable: bool,
    }

    fn finish(block: Option<Block>, streams: &mut Vec<PlaybackStream>) {
        if let Some(block) = block
            && !block.muted
            && let Some(application) = block.application
        {
            streams.push(PlaybackStream {
                id: block.id,
                application,
                resumable: block.resumable,
            });
        }
    }

    let mut streams = Vec::new();
    let mut current: Option<Block> = None;

    for line in listing.lines() {
        if let Some(id) = field(line, "index") {
            finish(current.take(), &mut streams);
            current = id.parse().ok().map(|id| Block { id, ..Block::default() });
            continue;
        }

        let Some(block) = current.as_mut() else { continue };
        if let Some(flags) = field(line, "flags") {
            block.resumable = flags.split_whitespace().any(|flag| flag == "START_CORKED");
        } else if let Some(muted) = field(line, "muted") {
            block.muted = muted == "yes";
        } else if let Some(name) = property(line, "application.name") {
            block.application = Some(name.to_string());
        }
    }
    finish(current, &mut streams);

    streams
}

/// Parses one line of `pactl subscribe`.
///
/// Only `new` and `remove` events on playback and capture streams are
/// relevant. `new` events carry no application name yet.
#[must_use]
pub fn feed_event(line: &str) -> Option<ServerEvent> {
    let rest = line.trim().strip_prefix("Event '")?;
    let (action, rest) = rest.split_once("' on ")?;
    let (facility, id) = rest.split_once(" #")?;

    let kind = match facility {
        "sink-input" => StreamKind::Output,
        "source-output" => StreamKind::Input,
        _ => return None,
    };
    let id = id.trim().parse().ok()?;

    match action {
        "new" => Some(ServerEvent::New { kind, id, application: None }),
        "remove" => Some(ServerEvent::removed(kind, id)),
        _ => None,
    }
}
