use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::graphviz::{Graph, NodeId};
use crate::location::Location;

const DEFAULT_DEBUG_FILE: &str = "debug_container.dot";

/// Configures debug logging and visualization for one build call.
///
/// Options compose: [`debug_options`] bundles several options, and
/// [`on_error`] / [`on_success`] defer options to the corresponding build
/// outcome. The default for [`inject`](crate::inject) is [`auto_debug`],
/// which dumps verbose output only when the build fails.
///
/// # Examples
///
/// ```rust
/// use solder::{configs, inject_debug, provide};
///
/// # fn main() -> Result<(), solder::InjectError> {
/// let (x,): (i32,) = inject_debug(
///     solder::logger(|line| eprintln!("{line}")),
///     configs([provide(|| 42i32)]),
/// )?;
/// assert_eq!(x, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DebugOption {
    apply: Rc<dyn Fn(&mut DebugConfig)>,
}

impl DebugOption {
    fn new(apply: impl Fn(&mut DebugConfig) + 'static) -> Self {
        Self {
            apply: Rc::new(apply),
        }
    }

    pub(crate) fn apply_config(&self, config: &mut DebugConfig) {
        (self.apply)(config);
    }
}

/// Routes container log lines to the given function.
pub fn logger(f: impl Fn(&str) + 'static) -> DebugOption {
    let f: Rc<dyn Fn(&str)> = Rc::new(f);
    DebugOption::new(move |config| {
        f("Initializing logger");
        config.loggers.push(f.clone());
        config.send_buffered_logs(&*f);
    })
}

/// Routes container log lines to stdout.
pub fn stdout_logger() -> DebugOption {
    logger(|line| println!("{line}"))
}

/// Routes container log lines to stderr.
pub fn stderr_logger() -> DebugOption {
    logger(|line| eprintln!("{line}"))
}

/// Routes container log lines to the `tracing` subscriber at DEBUG level.
pub fn tracing_logger() -> DebugOption {
    logger(|line| tracing::debug!(target: "solder", "{line}"))
}

/// Provides a function receiving the container rendering in Graphviz DOT
/// format once the build finishes.
pub fn visualizer(f: impl Fn(&str) + 'static) -> DebugOption {
    let f: Rc<dyn Fn(&str)> = Rc::new(f);
    DebugOption::new(move |config| config.visualizers.push(f.clone()))
}

/// Dumps the Graphviz DOT rendering to the log sinks.
pub fn log_visualizer() -> DebugOption {
    DebugOption::new(|config| config.log_visualizer = true)
}

/// Dumps the Graphviz DOT rendering to the given file.
pub fn file_visualizer(path: impl Into<PathBuf>) -> DebugOption {
    let path = path.into();
    DebugOption::new(move |config| config.file_visualizers.push(path.clone()))
}

/// Default debug options: stderr logging plus a DOT file dump.
pub fn debug() -> DebugOption {
    debug_options([stderr_logger(), file_visualizer(DEFAULT_DEBUG_FILE)])
}

/// Enables [`debug`] output only on error, and removes any stale DOT file on
/// success.
pub fn auto_debug() -> DebugOption {
    debug_options([
        on_error(debug()),
        on_success(debug_cleanup(|| {
            if std::fs::metadata(DEFAULT_DEBUG_FILE).is_ok() {
                let _ = std::fs::remove_file(DEFAULT_DEBUG_FILE);
            }
        })),
    ])
}

/// Applies the given option only when the build fails. Buffered log lines
/// are replayed into any logger the option registers.
pub fn on_error(option: DebugOption) -> DebugOption {
    DebugOption::new(move |config| {
        config.init_log_buffer();
        config.on_error = Some(option.clone());
    })
}

/// Applies the given option only when the build succeeds.
pub fn on_success(option: DebugOption) -> DebugOption {
    DebugOption::new(move |config| {
        config.init_log_buffer();
        config.on_success = Some(option.clone());
    })
}

/// Registers a cleanup function to run after the build returns.
pub fn debug_cleanup(cleanup: impl Fn() + 'static) -> DebugOption {
    let cleanup: Rc<dyn Fn()> = Rc::new(cleanup);
    DebugOption::new(move |config| config.cleanup.push(cleanup.clone()))
}

/// Bundles multiple debug options into one.
pub fn debug_options(options: impl IntoIterator<Item = DebugOption>) -> DebugOption {
    let options: Vec<DebugOption> = options.into_iter().collect();
    DebugOption::new(move |config| {
        for option in &options {
            option.apply_config(config);
        }
    })
}

/// Accumulated debug state for one build call.
#[derive(Default)]
pub(crate) struct DebugConfig {
    loggers: Vec<Rc<dyn Fn(&str)>>,
    indent: usize,
    log_buffer: Option<Rc<RefCell<Vec<String>>>>,
    pub(crate) graph: Graph,
    visualizers: Vec<Rc<dyn Fn(&str)>>,
    file_visualizers: Vec<PathBuf>,
    log_visualizer: bool,
    pub(crate) on_error: Option<DebugOption>,
    pub(crate) on_success: Option<DebugOption>,
    cleanup: Vec<Rc<dyn Fn()>>,
}

impl DebugConfig {
    pub(crate) fn indent_logger(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn dedent_logger(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub(crate) fn logf(&self, args: std::fmt::Arguments<'_>) {
        let line = format!("{:indent$}{args}", "", indent = self.indent);
        tracing::trace!(target: "solder", "{line}");
        for logger in &self.loggers {
            logger(&line);
        }
    }

    fn init_log_buffer(&mut self) {
        if self.log_buffer.is_none() {
            let buffer = Rc::new(RefCell::new(Vec::new()));
            self.log_buffer = Some(buffer.clone());
            self.loggers
                .push(Rc::new(move |line: &str| buffer.borrow_mut().push(line.into())));
        }
    }

    fn send_buffered_logs(&self, logger: &dyn Fn(&str)) {
        if let Some(buffer) = &self.log_buffer {
            for line in buffer.borrow().iter() {
                logger(line);
            }
        }
    }

    /// Renders the graph and delivers it to every configured sink.
    pub(crate) fn generate_graph(&mut self) {
        let dot = self.graph.render();
        if self.log_visualizer {
            self.logf(format_args!("DOT Graph: {dot}"));
        }
        for visualizer in &self.visualizers {
            visualizer(&dot);
        }
        for path in self.file_visualizers.clone() {
            match std::fs::write(&path, &dot) {
                Ok(()) => {
                    let shown = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
                    self.logf(format_args!(
                        "Saved graph of container to {}",
                        shown.display()
                    ));
                }
                Err(err) => self.logf(format_args!(
                    "Error saving graphviz file {}: {err}",
                    path.display()
                )),
            }
        }
    }

    pub(crate) fn run_cleanup(&mut self) {
        for cleanup in self.cleanup.drain(..) {
            cleanup();
        }
    }

    /// Node for a registration site, clustered under its scope.
    pub(crate) fn location_graph_node(
        &mut self,
        location: &Location,
        scope: Option<&str>,
    ) -> NodeId {
        let subgraph = scope.map(|name| {
            self.graph
                .find_or_create_subgraph(&format!("cluster_{name}"), &format!("Scope: {name}"))
                .0
        });
        let (node, existed) = self
            .graph
            .find_or_create_node(&location.full_name(), subgraph);
        if !existed {
            let attrs = self.graph.attrs_mut(node);
            attrs.set_shape("box");
            set_unused_style(attrs);
        }
        node
    }

    /// Node for a type.
    pub(crate) fn type_graph_node(&mut self, type_name: &str) -> NodeId {
        let (node, existed) = self.graph.find_or_create_node(type_name, None);
        if !existed {
            set_unused_style(self.graph.attrs_mut(node));
        }
        node
    }

    pub(crate) fn mark_graph_node_as_used(&mut self, node: NodeId) {
        let attrs = self.graph.attrs_mut(node);
        attrs.set_color("black");
        attrs.set_pen_width("1.5");
        attrs.set_font_color("black");
    }

    pub(crate) fn mark_graph_node_as_failed(&mut self, node: NodeId) {
        let attrs = self.graph.attrs_mut(node);
        attrs.set_color("red");
        attrs.set_font_color("red");
    }
}

fn set_unused_style(attrs: &mut crate::graphviz::Attributes) {
    attrs.set_color("lightgrey");
    attrs.set_pen_width("0.5");
    attrs.set_font_color("dimgrey");
}
