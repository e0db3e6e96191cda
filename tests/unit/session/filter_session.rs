use super::*;
use std::cell::RefCell;
use std::rc::Rc;

fn session_with_image() -> FilterSession {
    let mut s = FilterSession::default();
    s.set_base(PixelSurface::new(3, 2, 0xFF10_2030).unwrap())
        .unwrap();
    s
}

fn record(s: &mut FilterSession) -> Rc<RefCell<Vec<SessionEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    s.subscribe(move |e: &SessionEvent| sink.borrow_mut().push(e.clone()));
    events
}

fn states(events: &[SessionEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect()
}

#[test]
fn success_walks_the_happy_path() {
    let mut s = session_with_image();
    let events = record(&mut s);
    let unit = s.apply("setRGB(0, 0, 0xFFFFFFFF);").unwrap();
    let events = events.borrow();
    assert_eq!(
        states(&events),
        vec![
            SessionState::Compiling,
            SessionState::Staging,
            SessionState::Running,
            SessionState::Committing,
            SessionState::Idle,
        ]
    );
    assert!(events.contains(&SessionEvent::Committed {
        unit,
        history_len: 2
    }));
    assert_eq!(s.progress(), 100);
    assert_eq!(s.current().unwrap().pixel(0, 0), Some(0xFFFF_FFFF));
    assert!(s.history().can_undo());
}

#[test]
fn compile_error_reports_and_returns_to_idle() {
    let mut s = session_with_image();
    let events = record(&mut s);
    let err = s.submit("int x = ;").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::SourceError);
    let events = events.borrow();
    assert_eq!(
        states(&events),
        vec![
            SessionState::Compiling,
            SessionState::Error(ErrorCategory::SourceError),
            SessionState::Idle,
        ]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Failed { category: ErrorCategory::SourceError, message, recovery: Recovery::None }
            if message.starts_with("line 1, column 9")
    )));
    assert_eq!(events.last(), Some(&SessionEvent::StateChanged {
        from: SessionState::Error(ErrorCategory::SourceError),
        to: SessionState::Idle
    }));
    assert_eq!(s.progress(), 100);
    assert_eq!(s.history().len(), 1);
}

#[test]
fn empty_input_is_its_own_category() {
    let mut s = session_with_image();
    let err = s.apply("   ").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::EmptyInput);
    assert_eq!(err.user_message(), "Nothing to do. Write some code first.");
    assert_eq!(s.state(), SessionState::Idle);
}

#[test]
fn runtime_failure_rolls_back() {
    let mut s = session_with_image();
    let before = s.current().unwrap().clone();
    let events = record(&mut s);
    s.submit("setRGB(0, 0, 0); int z = 0; z = 1 / z;").unwrap();
    let err = s.wait().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::GeneralError);
    assert_eq!(s.current(), Some(&before));
    assert_eq!(s.history().len(), 1);
    let st = states(&events.borrow());
    assert_eq!(
        &st[st.len() - 3..],
        &[
            SessionState::RollingBack,
            SessionState::Error(ErrorCategory::GeneralError),
            SessionState::Idle
        ]
    );
}

#[test]
fn busy_session_rejects_everything_else() {
    let mut s = session_with_image();
    s.submit("while (true) { }").unwrap();
    assert!(s.is_busy());
    for err in [
        s.submit("int x = 1;").unwrap_err(),
        s.undo().unwrap_err(),
        s.revert().unwrap_err(),
        s.purge_history().unwrap_err(),
        s.set_base(PixelSurface::new(1, 1, 0).unwrap()).unwrap_err(),
    ] {
        assert_eq!(err.category(), ErrorCategory::InvalidOperation);
    }
    assert!(s.cancel());
    let err = s.wait().unwrap_err();
    assert_eq!(err.user_message(), "filter cancelled");
    assert!(!s.is_busy());
    assert!(!s.cancel());
}

#[test]
fn submit_without_image_is_invalid() {
    let mut s = FilterSession::default();
    let err = s.submit("int x = 1;").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidOperation);
    assert_eq!(s.state(), SessionState::Idle);
    assert!(s.transitions().is_empty());
}

#[test]
fn wait_without_run_is_invalid() {
    let mut s = session_with_image();
    assert_eq!(
        s.wait().unwrap_err().category(),
        ErrorCategory::InvalidOperation
    );
    assert!(s.poll().is_none());
}

#[test]
fn staging_oom_offers_purge_only_when_history_can_shrink() {
    let mut s = FilterSession::new(SessionOpts {
        history_budget_bytes: Some(3 * 2 * 4 * 2),
        ..SessionOpts::default()
    });
    s.set_base(PixelSurface::new(3, 2, 0).unwrap()).unwrap();
    let events = record(&mut s);

    s.apply("setRGB(0, 0, 1);").unwrap();
    let err = s.apply("setRGB(0, 0, 2);").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::OutOfMemory);
    assert!(events.borrow().iter().any(|e| matches!(
        e,
        SessionEvent::Failed { recovery: Recovery::PurgeAndRetry, .. }
    )));
    assert_eq!(s.history().len(), 2);

    assert!(s.purge_history().unwrap());
    assert_eq!(s.history().len(), 1);
    s.apply("setRGB(0, 0, 2);").unwrap();
    assert_eq!(s.current().unwrap().pixel(0, 0), Some(2));
}

#[test]
fn warnings_from_last_run_are_kept() {
    let mut s = FilterSession::new(SessionOpts {
        warnings: true,
        max_warnings: 10,
        ..SessionOpts::default()
    });
    s.set_base(PixelSurface::new(1, 1, 0).unwrap()).unwrap();
    s.apply("int c = makeRGB(256, 0, 0);").unwrap();
    assert_eq!(s.last_warnings().len(), 1);
    assert_eq!(s.suppressed_warnings(), 0);
}

#[test]
fn poll_drives_run_to_completion() {
    let mut s = session_with_image();
    let unit = s.submit("setProgress(1, 2);").unwrap();
    let result = loop {
        if let Some(r) = s.poll() {
            break r;
        }
        std::thread::yield_now();
    };
    assert_eq!(result.unwrap(), unit);
    assert_eq!(s.state(), SessionState::Idle);
    assert_eq!(s.progress(), 100);
}
