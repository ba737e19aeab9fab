// FormatSelector - maps upstream preset tags to known formats
//
// Handles:
// - Preset classification by substring ("mp3_0_0" -> MP3, "opus_0_0" -> OPUS)
// - Declared bitrates per format
// - Picking the best audio stream for playback
//
// Upstream introduces new presets without notice; anything unrecognized is
// dropped rather than treated as an error.

use super::models::{DeliveryMethod, MediaFormat, StreamDescriptor};

/// Declared bitrate for MP3 transcodings, in kbps.
///
/// Upstream does not report bitrates, so this is an approximation, not a
/// measured value.
pub const MP3_BITRATE: u32 = 128;

/// Declared bitrate for OPUS transcodings, in kbps. Approximation as above.
pub const OPUS_BITRATE: u32 = 128;

/// Format selector with preset recognition
pub struct FormatSelector;

impl FormatSelector {
    /// Recognized format and declared bitrate for a preset tag
    pub fn classify(preset: &str) -> Option<(MediaFormat, u32)> {
        let preset = preset.to_ascii_lowercase();
        if preset.contains("mp3") {
            Some((MediaFormat::Mp3, MP3_BITRATE))
        } else if preset.contains("opus") {
            Some((MediaFormat::Opus, OPUS_BITRATE))
        } else {
            None
        }
    }

    /// Build a descriptor from a resolved URL, or `None` for unknown presets
    pub fn describe(preset: &str, url: String, delivery: DeliveryMethod) -> Option<StreamDescriptor> {
        Self::classify(preset).map(|(format, bitrate)| StreamDescriptor {
            url,
            format,
            bitrate,
            delivery,
        })
    }

    /// Best stream for playback: preferred format first, then progressive over
    /// HLS, then higher declared bitrate. Ties keep enumeration order.
    pub fn best_audio(
        streams: &[StreamDescriptor],
        preferred: MediaFormat,
    ) -> Option<&StreamDescriptor> {
        streams
            .iter()
            .enumerate()
            .max_by_key(|(index, s)| {
                (
                    s.format == preferred,
                    Self::delivery_rank(s.delivery),
                    s.bitrate,
                    std::cmp::Reverse(*index),
                )
            })
            .map(|(_, s)| s)
    }

    fn delivery_rank(delivery: DeliveryMethod) -> u8 {
        match delivery {
            DeliveryMethod::Progressive => 2,
            DeliveryMethod::Hls => 1,
            DeliveryMethod::Unknown => 0,
        }
    }
}
