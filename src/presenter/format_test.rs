use super::*;

#[test]
fn echo_and_dash_are_stripped() {
    assert_eq!(
        format_result_message(0, "0% - Just basic information exchange. No flirting at all."),
        "0% - Just basic information exchange. No flirting at all."
    );
}

#[test]
fn tip_is_split_onto_its_own_paragraph() {
    assert_eq!(
        format_result_message(25, "25% - Weak flirting attempts, mostly one-sided. Tip: Be more direct."),
        "25% - Weak flirting attempts, mostly one-sided.\n\nTip: Be more direct."
    );
}

#[test]
fn only_first_tip_marker_splits() {
    assert_eq!(format_result_message(10, "Dry. Tip: try Tip: jokes"), "10% - Dry.\n\nTip: try Tip: jokes");
}

#[test]
fn reply_without_echo_is_prefixed() {
    assert_eq!(format_result_message(75, "Clear sexual tension."), "75% - Clear sexual tension.");
}

#[test]
fn mismatched_echo_is_kept() {
    // Parsed 82 from the middle; the reply does not start with "82%".
    assert_eq!(
        format_result_message(82, "Well hello there, 82% if you ask me"),
        "82% - Well hello there, 82% if you ask me"
    );
}

#[test]
fn empty_tip_is_dropped() {
    assert_eq!(format_result_message(40, "40% -- Meh. Tip:   "), "40% - Meh.");
}

#[test]
fn bands_split_at_thirty_and_seventy() {
    assert_eq!(VibeBand::for_percentage(0), VibeBand::Low);
    assert_eq!(VibeBand::for_percentage(29), VibeBand::Low);
    assert_eq!(VibeBand::for_percentage(30), VibeBand::Mid);
    assert_eq!(VibeBand::for_percentage(69), VibeBand::Mid);
    assert_eq!(VibeBand::for_percentage(70), VibeBand::High);
    assert_eq!(VibeBand::for_percentage(100), VibeBand::High);
}

#[test]
fn band_css_vars() {
    assert_eq!(VibeBand::Low.css_var(), "--bad-vibe-color");
    assert_eq!(VibeBand::Mid.css_var(), "--medium-vibe-color");
    assert_eq!(VibeBand::High.css_var(), "--good-vibe-color");
}
