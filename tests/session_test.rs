mod common;

use common::StubTarget;
use crossterm::event::{KeyCode, KeyModifiers};
use gom::tui::{Event, Session};

fn key(session: &mut Session, code: KeyCode) {
    session.handle(Event::Key(code, KeyModifiers::NONE));
}

fn command(session: &mut Session, text: &str) {
    key(session, KeyCode::Char(':'));
    for c in text.chars() {
        key(session, KeyCode::Char(c));
    }
    key(session, KeyCode::Enter);
}

fn names(session: &Session) -> Vec<String> {
    session
        .report()
        .lines
        .iter()
        .map(|l| l.rsplit(' ').next().unwrap().to_string())
        .collect()
}

fn loaded() -> (std::sync::Arc<StubTarget>, Session) {
    let target = StubTarget::new();
    let mut session = Session::new(common::registry(&target), "heap").unwrap();
    session.handle(Event::Resize(80, 40));
    session.handle(Event::Tick);
    (target, session)
}

#[test]
fn test_tick_loads_report_and_stats() {
    let (target, session) = loaded();
    assert_eq!(session.status(), "");
    assert_eq!(names(&session), ["main.decode", "bytes.Grow", "main.encode", "main.main"]);
    assert_eq!(session.stats().goroutines.as_vec(), vec![12]);
    assert_eq!(target.fetches(), 1);
}

#[test]
fn test_ticks_reuse_cache() {
    let (target, mut session) = loaded();
    session.handle(Event::Tick);
    session.handle(Event::Tick);
    assert_eq!(target.fetches(), 1);
    assert_eq!(session.stats().threads.len(), 3);
}

#[test]
fn test_resize_does_not_fetch() {
    let (target, mut session) = loaded();
    session.handle(Event::Resize(120, 50));
    assert_eq!(target.fetches(), 1);
}

#[test]
fn test_sort_toggle_and_refresh() {
    let (target, mut session) = loaded();
    key(&mut session, KeyCode::Down);
    command(&mut session, "s");
    assert!(session.is_cumulative());
    assert_eq!(session.page(), 0);
    assert_eq!(names(&session)[0], "main.main");
    assert_eq!(target.fetches(), 1);

    command(&mut session, "r");
    assert_eq!(target.fetches(), 2);
}

#[test]
fn test_filter_and_clear() {
    let (_target, mut session) = loaded();
    command(&mut session, "f=decode");
    assert_eq!(session.filter_text(), "decode");
    let mut filtered = names(&session);
    filtered.sort();
    assert_eq!(filtered, ["main.decode", "main.main"]);

    command(&mut session, "f=");
    assert_eq!(session.filter_text(), "");
    assert_eq!(names(&session).len(), 4);
}

#[test]
fn test_kind_switch_resets_filter_and_page() {
    let (target, mut session) = loaded();
    command(&mut session, "f=decode");
    key(&mut session, KeyCode::Down);
    command(&mut session, "k=allocs");
    assert_eq!(session.kind(), "allocs");
    assert_eq!(session.filter_text(), "");
    assert_eq!(session.page(), 0);
    assert_eq!(target.fetches(), 2);

    command(&mut session, "k=bogus");
    assert_eq!(session.kind(), "allocs");
    assert!(session.status().contains("bogus"));
}

#[test]
fn test_pagination() {
    let (_target, mut session) = loaded();
    // 2 report lines per page
    session.handle(Event::Resize(80, 16));
    assert_eq!(session.page_size(), 2);
    assert_eq!(session.page_lines().len(), 2);

    command(&mut session, "p=2");
    assert_eq!(session.page(), 1);
    assert_eq!(session.page_lines().len(), 2);

    key(&mut session, KeyCode::PageDown);
    assert!(session.page_lines().is_empty());

    command(&mut session, "p=0");
    assert_eq!(session.page(), 0);
    key(&mut session, KeyCode::Up);
    assert_eq!(session.page(), 0);
}

#[test]
fn test_failed_refresh_keeps_report() {
    let (target, mut session) = loaded();
    let before = session.report().clone();
    target.set_failing(true);
    command(&mut session, "r");
    assert!(session.status().contains("connection refused"));
    assert_eq!(session.report(), &before);

    session.handle(Event::Tick);
    assert_eq!(session.stats().goroutines.len(), 1);
}

#[test]
fn test_ctrl_c_quits() {
    let (_target, mut session) = loaded();
    key(&mut session, KeyCode::Char(':'));
    session.handle(Event::Key(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(!session.is_running());
}
