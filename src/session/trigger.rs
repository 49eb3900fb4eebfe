use crossterm::event::{KeyCode, KeyEvent};

/// The two-character sequence that opens a search session.
pub const TRIGGER: &str = "[[";
pub const TRIGGER_LEN: usize = 2;

/// True when the text strictly before the caret ends with the trigger.
pub fn ends_with_trigger(text_before: &str) -> bool {
    text_before.ends_with(TRIGGER)
}

/// Char offset of the trigger's first character for a caret sitting just
/// after the second one.
pub fn trigger_start(caret: usize) -> usize {
    caret - TRIGGER_LEN
}

/// Query text of an armed session: the chars between the trigger and the
/// caret. `text_before` is everything before the caret, so the query is its
/// tail starting at `anchor_offset + TRIGGER_LEN`. Returns `None` when the
/// caret has moved back into (or before) the trigger, which cancels the
/// session rather than producing a negative-length span.
pub fn query_between(text_before: &str, anchor_offset: usize) -> Option<String> {
    let start = anchor_offset + TRIGGER_LEN;
    let caret = text_before.chars().count();
    if caret < start {
        return None;
    }
    Some(text_before.chars().skip(start).collect())
}

/// Keys that edit block content. Anything else (modifiers, function keys)
/// neither arms nor refines a session.
pub fn is_content_key(key: &KeyEvent) -> bool {
    matches!(
        key.code,
        KeyCode::Char(_) | KeyCode::Backspace | KeyCode::Delete | KeyCode::Enter
    )
}

pub fn is_arrow_key(key: &KeyEvent) -> bool {
    matches!(
        key.code,
        KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down
    )
}
