use super::*;
use crate::filter::compiler::FilterCompiler;
use crate::foundation::error::ErrorCategory;
use std::cell::RefCell;
use std::rc::Rc;

fn unit(src: &str) -> FilterUnit {
    FilterCompiler::new().compile(src).unwrap()
}

fn surface() -> PixelSurface {
    PixelSurface::from_argb(2, 2, vec![0xFF00_0000; 4]).unwrap()
}

fn progress_values(handle: &mut ExecutionHandle) -> (Vec<u8>, Completion) {
    let mut seen = Vec::new();
    while let Some(ev) = handle.next_event() {
        match ev {
            ExecEvent::Progress(p) => seen.push(p),
            ExecEvent::Complete(c) => return (seen, c),
        }
    }
    panic!("stream ended without completion");
}

#[test]
fn success_streams_progress_then_completion() {
    let exec = FilterExecutor::default();
    let mut handle = exec
        .execute(
            unit("for (int y = 0; y < height(); y++) { setRGB(0, y, 0xFFFFFFFF); setProgress(y + 1, height()); }"),
            surface(),
        )
        .unwrap();
    let (seen, done) = progress_values(&mut handle);
    assert_eq!(seen, vec![0, 50, 99, 100]);
    assert!(done.outcome.is_success());
    let s = done.surface.unwrap();
    assert_eq!(s.pixel(0, 1), Some(0xFFFF_FFFF));
    assert_eq!(s.pixel(1, 1), Some(0xFF00_0000));
    assert!(handle.is_finished());
    assert!(handle.next_event().is_none());
}

#[test]
fn runtime_error_becomes_general_failure_with_terminal_progress() {
    let exec = FilterExecutor::default();
    let mut handle = exec.execute(unit("int z = 0; int q = 1 / z;"), surface()).unwrap();
    let (seen, done) = progress_values(&mut handle);
    assert_eq!(seen.last(), Some(&100));
    let err = done.outcome.error().unwrap();
    assert_eq!(err.category(), ErrorCategory::GeneralError);
    assert!(err.user_message().contains("/ by zero"));
    assert!(done.surface.is_some());
}

#[test]
fn listeners_fire_on_polling_thread() {
    let exec = FilterExecutor::default();
    let mut handle = exec.execute(unit("setProgress(1, 4);"), surface()).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(RefCell::new(false));
    let s = Rc::clone(&seen);
    handle.on_progress(move |p| s.borrow_mut().push(p));
    let c = Rc::clone(&completed);
    handle.on_complete(move |o| *c.borrow_mut() = o.is_success());
    let done = handle.wait();
    assert!(done.outcome.is_success());
    assert_eq!(*seen.borrow(), vec![0, 25, 100]);
    assert!(*completed.borrow());
}

#[test]
fn cancel_stops_endless_loop() {
    let exec = FilterExecutor::default();
    let handle = exec.execute(unit("while (true) { }"), surface()).unwrap();
    handle.cancel();
    let done = handle.wait();
    let err = done.outcome.error().unwrap();
    assert_eq!(err.category(), ErrorCategory::GeneralError);
    assert_eq!(err.user_message(), "filter cancelled");
}

#[test]
fn warnings_are_collected_when_enabled() {
    let exec = FilterExecutor::new(ExecutorOpts {
        warnings: true,
        max_warnings: 1,
        stack_bytes: None,
    });
    let done = exec
        .execute(unit("setRGB(-1, 0, 0); int c = getRGB(5, 5);"), surface())
        .unwrap()
        .wait();
    assert!(done.outcome.is_success());
    assert_eq!(done.warnings.entries().len(), 1);
    assert_eq!(done.warnings.suppressed(), 1);
    assert!(done.warnings.entries()[0].contains("[-1,0]"));
}

#[test]
fn poll_eventually_returns_completion() {
    let exec = FilterExecutor::default();
    let mut handle = exec.execute(unit("int x = 1;"), surface()).unwrap();
    let done = loop {
        if let Some(c) = handle.poll() {
            break c;
        }
        std::thread::yield_now();
    };
    assert!(done.outcome.is_success());
    assert_eq!(handle.progress(), 100);
}
