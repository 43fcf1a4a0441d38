use std::cell::RefCell;
use std::rc::Rc;

use solder::{
    configs, debug_cleanup, debug_options, file_visualizer, inject_debug, log_visualizer, logger,
    on_error, on_success, provide, visualizer,
};

fn string_sink() -> (Rc<RefCell<String>>, impl Fn(&str) + 'static) {
    let buffer: Rc<RefCell<String>> = Rc::default();
    let sink = buffer.clone();
    let write = move |line: &str| {
        sink.borrow_mut().push_str(line);
        sink.borrow_mut().push('\n');
    };
    (buffer, write)
}

#[test]
fn debug_options_capture_logs_and_graph() {
    let (log, log_sink) = string_sink();
    let dot: Rc<RefCell<String>> = Rc::default();
    let dot_sink = dot.clone();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("container.dot");

    let options = debug_options([
        logger(log_sink),
        visualizer(move |graph| *dot_sink.borrow_mut() = graph.to_string()),
        log_visualizer(),
        file_visualizer(&path),
    ]);
    let (x,): (i32,) = inject_debug(options, configs([provide(|| 7i32)])).unwrap();
    assert_eq!(x, 7);

    let log = log.borrow();
    assert!(log.contains("Registering providers"));
    assert!(log.contains("digraph"));
    assert!(dot.borrow().contains("digraph"));
    assert!(dot.borrow().contains("i32"));

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("digraph"));
}

#[test]
fn on_error_replays_buffered_logs() {
    let (log, log_sink) = string_sink();
    let options = on_error(logger(log_sink));

    let result: Result<(String,), _> = inject_debug(options, configs([]));
    assert!(result.is_err());

    let log = log.borrow();
    assert!(log.contains("Registering providers"));
    assert!(log.contains("Error:"));
}

#[test]
fn on_error_hooks_stay_quiet_on_success() {
    let (log, log_sink) = string_sink();
    let options = on_error(logger(log_sink));

    let (x,): (i32,) = inject_debug(options, configs([provide(|| 1i32)])).unwrap();
    assert_eq!(x, 1);
    assert!(log.borrow().is_empty());
}

#[test]
fn on_success_and_cleanup_hooks_run() {
    let cleaned: Rc<RefCell<bool>> = Rc::default();
    let flag = cleaned.clone();
    let options = on_success(debug_cleanup(move || *flag.borrow_mut() = true));

    let (x,): (i32,) = inject_debug(options, configs([provide(|| 2i32)])).unwrap();
    assert_eq!(x, 2);
    assert!(*cleaned.borrow());
}

#[test]
fn graph_marks_used_providers() {
    fn provide_seven() -> i32 {
        7
    }
    let dot: Rc<RefCell<String>> = Rc::default();
    let dot_sink = dot.clone();
    let (x,): (i32,) = inject_debug(
        visualizer(move |graph| *dot_sink.borrow_mut() = graph.to_string()),
        configs([provide(provide_seven)]),
    )
    .unwrap();
    assert_eq!(x, 7);
    let dot = dot.borrow();
    assert!(dot.contains("provide_seven"));
    assert!(dot.contains("color=\"black\""));
}
