//! C1: Trigger Classifier (§4.1).
//!
//! Maps a single emoji or a lowercased text token to a karma sign. Sets are
//! immutable and grounded verbatim on the original `karmic_triggers.py`
//! fixed lists, translated to `phf`-free `HashSet`s built once via
//! `std::sync::LazyLock` (the teacher has no equivalent static-set pattern,
//! so this leans on std directly — there is no ecosystem crate in the
//! teacher's or pack's dependency set that this would warrant pulling in).

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::TriggerSign;

static POSITIVE_EMOJI: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "\u{1F44D}", // 👍
        "\u{1F64F}", // 🙏 folded hands
        "\u{1F91D}", // 🤝 handshake
        "\u{1F44F}", // 👏 clap
        "\u{1F4AF}", // 💯
        "\u{1F3C6}", // 🏆 trophy
        "\u{2764}",  // ❤ heart
        "\u{1F60D}", // 😍
        "\u{1F929}", // 🤩 star-struck
        "\u{1F525}", // 🔥 fire
        "\u{1F4A5}", // 💥 explosion
        "\u{1F4DD}", // 📝 pen
        "\u{270D}",  // ✍ writing hand
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_EMOJI: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "\u{1F44E}", // 👎
        "\u{1F494}", // 💔 broken heart
        "\u{1F92E}", // 🤮 vomit
        "\u{1F4A9}", // 💩 poo
    ]
    .into_iter()
    .collect()
});

static POSITIVE_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "+",
        "спасибо",
        "спс",
        "спасибочки",
        "спасибки",
        "благодарю",
        "пасиба",
        "пасеба",
        "посеба",
        "благодарочка",
        "благодарствую",
        "мерси",
        "выручил",
        "сяп",
        "сяб",
        "сенк",
        "сенкс",
        "сяпки",
        "сябки",
        "сенью",
        "thx",
        "thank",
        "thanks",
        "класс",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| ["-"].into_iter().collect());

/// Classify a single emoji grapheme or a lowercased token (§4.1). Ties
/// (an emoji that also matches a word set) can't happen given the disjoint
/// sets above, but summing signs across multiple triggers is the caller's
/// job (C8 step 4), not this function's.
pub fn classify(token: &str) -> TriggerSign {
    if POSITIVE_EMOJI.contains(token) || POSITIVE_WORDS.contains(token) {
        return TriggerSign::Positive;
    }
    if NEGATIVE_EMOJI.contains(token) || NEGATIVE_WORDS.contains(token) {
        return TriggerSign::Negative;
    }
    TriggerSign::Neutral
}

/// Classify a lowercased word token specifically (callers doing text-trigger
/// classification should lowercase first; emoji are case-insensitive by
/// construction so `classify` handles both without this wrapper, but this
/// makes the text-trigger intent explicit at call sites).
pub fn classify_word(token: &str) -> TriggerSign {
    classify(&token.to_lowercase())
}
