use jump_core::overlay::{layout_tags, render};
use jump_core::{
    CandidateSpan, CaseRule, Dispatcher, Granularity, HostEditor, Key, MemoryHost, Mode,
    OverlayOptions, ScanOptions, Scope, Settings, TagScheme, scan,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn documents() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just("a"),
            Just("bc"),
            Just("Déjà"),
            Just("_x1"),
            Just(" "),
            Just("  "),
            Just("\t"),
            Just("\n"),
            Just("\r\n"),
            Just("日本"),
            Just("e\u{301}"),
            Just(";"),
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

fn granularities() -> impl Strategy<Value = Granularity> {
    prop_oneof![
        Just(Granularity::Word),
        Just(Granularity::Line),
        Just(Granularity::Char('a')),
        Just(Granularity::Char('b')),
    ]
}

fn rendered(
    text: &str,
    granularity: &Granularity,
    scheme: TagScheme,
    options: OverlayOptions,
) -> (Vec<CandidateSpan>, jump_core::OverlayBuffer) {
    let scan_options = ScanOptions {
        limit: scheme.capacity(),
        case_rule: CaseRule {
            case_sensitive: false,
            smart_case: false,
        },
    };
    let mut spans = scan(text, 0, granularity, &scan_options).unwrap();
    layout_tags(text, 0, &mut spans, &scheme, options.center);
    let overlay = render(text, 0, &mut spans, options);
    (spans, overlay)
}

proptest! {
    #[test]
    fn tag_then_cancel_restores_every_byte(
        text in documents(),
        center in any::<bool>(),
        hide in any::<bool>(),
        single in any::<bool>(),
    ) {
        let mut settings = Settings::default();
        settings.tags.center = center;
        settings.tags.hide_matched_text = hide;
        settings.tags.include_single_char = single;

        let mut host = MemoryHost::new(&text);
        let mut dispatcher = Dispatcher::new(settings);
        let len = host.document_len();
        if dispatcher.tag_words(&mut host, Scope::Range(0..len)).is_ok() {
            prop_assert_eq!(dispatcher.mode(), Mode::TaggingWord);
            dispatcher.on_key(&mut host, Key::Escape);
        }
        prop_assert_eq!(dispatcher.mode(), Mode::Idle);
        prop_assert_eq!(host.text(), text);
        prop_assert!(!host.is_read_only());
        prop_assert!(host.marks().is_empty());
        prop_assert!(host.active_subscriptions().is_empty());
    }

    #[test]
    fn tags_sit_where_the_ledger_says(
        text in documents(),
        granularity in granularities(),
        center in any::<bool>(),
        single in any::<bool>(),
    ) {
        let scheme = TagScheme { include_single_char: single, uppercase: false };
        let options = OverlayOptions { center, hide_matched_text: false };
        let (spans, overlay) = rendered(&text, &granularity, scheme, options);

        prop_assert_eq!(
            overlay.text().len(),
            text.len() + overlay.ledger().total()
        );
        for placement in overlay.placements() {
            let tag = &spans[placement.span].tag;
            let shown = &overlay.text()[placement.overlay_pos..placement.overlay_pos + placement.len];
            prop_assert_eq!(shown, tag.as_str());
        }
        for span in &spans {
            prop_assert_eq!(overlay.document_to_overlay(span.doc_start), span.overlay_start);
            prop_assert_eq!(overlay.overlay_to_document(span.overlay_start), span.doc_start);
        }
    }
}

#[test]
fn overlay_replaces_only_the_requested_range() {
    let mut host = MemoryHost::new("keep this\nfoo bar\nkeep that");
    let mut dispatcher = Dispatcher::new(Settings::default());

    dispatcher.tag_words(&mut host, Scope::Range(10..17)).unwrap();
    assert_eq!(host.text(), "keep this\na   b  \nkeep that");
    assert!(host.is_read_only());

    dispatcher.cancel(&mut host).unwrap();
    assert_eq!(host.text(), "keep this\nfoo bar\nkeep that");
    assert_eq!(host.undo_depth(), 0);
}

#[test]
fn overflowing_tags_are_tracked_per_line() {
    let mut settings = Settings::default();
    settings.tags.include_single_char = false;
    let mut host = MemoryHost::new("a\nb\tc");
    let mut dispatcher = Dispatcher::new(settings);

    dispatcher.tag_words(&mut host, Scope::Range(0..5)).unwrap();
    assert_eq!(host.text(), "aa\nab\tac");

    let overlay = dispatcher.overlay().unwrap();
    assert_eq!(overlay.ledger().filler_on_line(0), 1);
    assert_eq!(overlay.ledger().filler_on_line(1), 2);
    assert_eq!(overlay.overlay_to_document(6), 4);

    dispatcher.on_key(&mut host, Key::Char('a'));
    dispatcher.on_key(&mut host, Key::Char('c'));
    assert_eq!(host.text(), "a\nb\tc");
    assert_eq!(host.get_cursor(), 4);
}
