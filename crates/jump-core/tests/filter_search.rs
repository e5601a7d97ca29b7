use jump_core::{
    AfterJump, CaseRule, Dispatcher, FilterOutcome, FilterState, Granularity, HostEditor, Key,
    MarkKind, MatchPolicy, MemoryHost, Mode, ScanOptions, Scope, SearchKind, SearchSettings,
    Settings, scan, valid_smart_case,
};
use pretty_assertions::assert_eq;

fn sensitive_prefix() -> SearchSettings {
    SearchSettings {
        policy: MatchPolicy::Prefix,
        case_sensitive: true,
        smart_case: false,
        wait_for_enter: true,
        wrap_around: true,
    }
}

#[test]
fn smart_case_examples() {
    assert!(valid_smart_case('A', 'a'));
    assert!(!valid_smart_case('a', 'A'));
    assert!(valid_smart_case('A', 'A'));
}

#[test]
fn prefix_filter_over_words() {
    let text = "foo bar foo baz";
    let options = ScanOptions {
        limit: 720,
        case_rule: CaseRule {
            case_sensitive: true,
            smart_case: false,
        },
    };
    let mut spans = scan(text, 0, &Granularity::Word, &options).unwrap();
    let starts: Vec<usize> = spans.iter().map(|s| s.doc_start).collect();
    assert_eq!(starts, vec![0, 4, 8, 12]);

    let mut filter = FilterState::new(&sensitive_prefix(), Some(0));
    filter.push_char('f', &mut spans);
    filter.push_char('o', &mut spans);
    assert_eq!(
        filter.push_char('o', &mut spans),
        FilterOutcome::Pending { matches: 2 }
    );
    let matching: Vec<usize> = spans
        .iter()
        .filter(|s| s.matches_filter)
        .map(|s| s.doc_start)
        .collect();
    assert_eq!(matching, vec![0, 8]);
    assert_eq!(filter.active(), Some(0));
}

#[test]
fn word_search_jumps_to_unique_match() {
    let mut host = MemoryHost::new("alpha beta gamma delta");
    let mut dispatcher = Dispatcher::new(Settings::default());

    dispatcher
        .search(&mut host, SearchKind::Word, Scope::Range(0..22))
        .unwrap();
    assert_eq!(dispatcher.mode(), Mode::Searching(SearchKind::Word));
    assert_eq!(host.text(), "alpha beta gamma delta");

    dispatcher.on_key(&mut host, Key::Char('g'));
    assert_eq!(dispatcher.mode(), Mode::Idle);
    assert_eq!(host.get_cursor(), 11);
    assert!(host.marks().is_empty());
}

#[test]
fn navigation_wraps_and_enter_resolves_active_match() {
    let mut host = MemoryHost::new("foo bar foo baz foo");
    host.set_cursor(9);
    let mut settings = Settings::default();
    settings.search = sensitive_prefix();
    let mut dispatcher = Dispatcher::new(settings);

    dispatcher
        .search(&mut host, SearchKind::Word, Scope::Range(0..19))
        .unwrap();
    for ch in "fo".chars() {
        dispatcher.on_key(&mut host, Key::Char(ch));
    }
    // Nearest to the cursor at 9 is the "foo" at 8.
    let colored = host.marks_of(MarkKind::TextColor);
    assert_eq!(colored.len(), 1);
    assert_eq!(colored[0].start, 8);
    assert_eq!(host.marks_of(MarkKind::Highlight).len(), 3);

    dispatcher.on_key(&mut host, Key::Right);
    dispatcher.on_key(&mut host, Key::Right);
    assert_eq!(host.marks_of(MarkKind::TextColor)[0].start, 0);
    dispatcher.on_key(&mut host, Key::Left);
    assert_eq!(host.marks_of(MarkKind::TextColor)[0].start, 16);

    dispatcher.on_key(&mut host, Key::Enter);
    assert_eq!(dispatcher.mode(), Mode::Idle);
    assert_eq!(host.get_cursor(), 16);
}

#[test]
fn backspace_on_empty_query_cancels_search() {
    let mut host = MemoryHost::new("one two");
    host.set_cursor(3);
    let mut dispatcher = Dispatcher::new(Settings::default());
    dispatcher
        .search(&mut host, SearchKind::Word, Scope::Range(0..7))
        .unwrap();

    dispatcher.on_key(&mut host, Key::Char('x'));
    assert_eq!(dispatcher.query(), Some("x"));
    dispatcher.on_key(&mut host, Key::Backspace);
    assert_eq!(dispatcher.mode(), Mode::Searching(SearchKind::Word));
    dispatcher.on_key(&mut host, Key::Backspace);
    assert_eq!(dispatcher.mode(), Mode::Idle);
    assert_eq!(host.get_cursor(), 3);
}

#[test]
fn substring_search_rescans_occurrences() {
    let mut host = MemoryHost::new("x.y x.z X.y");
    let mut settings = Settings::default();
    settings.search.wait_for_enter = true;
    let mut dispatcher = Dispatcher::new(settings);

    dispatcher
        .search(&mut host, SearchKind::Substring, Scope::Range(0..11))
        .unwrap();
    dispatcher.on_key(&mut host, Key::Char('x'));
    dispatcher.on_key(&mut host, Key::Char('.'));
    assert_eq!(dispatcher.spans().len(), 3);
    dispatcher.on_key(&mut host, Key::Char('y'));
    let starts: Vec<usize> = dispatcher.spans().iter().map(|s| s.doc_start).collect();
    assert_eq!(starts, vec![0, 8]);

    dispatcher.on_key(&mut host, Key::Right);
    dispatcher.on_key(&mut host, Key::Enter);
    assert_eq!(host.get_cursor(), 8);
}

#[test]
fn select_to_anchor_after_jump_and_jump_back() {
    let mut host = MemoryHost::new("start middle finish");
    host.set_cursor(2);
    let mut settings = Settings::default();
    settings.jump.after = AfterJump::SelectToAnchor;
    let mut dispatcher = Dispatcher::new(settings);

    dispatcher
        .search(&mut host, SearchKind::Word, Scope::Range(0..19))
        .unwrap();
    dispatcher.on_key(&mut host, Key::Char('f'));
    assert_eq!(host.get_selection(), Some(2..13));
    assert_eq!(host.get_cursor(), 13);

    dispatcher.jump_back(&mut host).unwrap();
    assert_eq!(host.get_cursor(), 2);
    dispatcher.jump_back(&mut host).unwrap();
    assert_eq!(host.get_cursor(), 13);
}

#[test]
fn current_line_scope_limits_candidates() {
    let mut host = MemoryHost::new("aa ab\nac ad\nae");
    host.set_cursor(7);
    let mut dispatcher = Dispatcher::new(Settings::default());
    dispatcher
        .search(&mut host, SearchKind::Word, Scope::CurrentLine)
        .unwrap();
    let starts: Vec<usize> = dispatcher.spans().iter().map(|s| s.doc_start).collect();
    assert_eq!(starts, vec![6, 9]);
    dispatcher.cancel(&mut host).unwrap();
}
