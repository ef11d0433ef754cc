//! Line-oriented observers over process output.
//!
//! An observer holds `(pattern, action)` rules evaluated once per line in
//! registration order. The first matching `Echo` or `Suppress` rule decides
//! whether the line is printed; every matching `Emit` rule fires its signal.

/// Matches any line containing the needle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePattern(String);

impl LinePattern {
    pub fn contains(needle: impl Into<String>) -> Self {
        LinePattern(needle.into())
    }

    #[inline]
    pub fn matches(&self, line: &str) -> bool {
        line.contains(self.0.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction<S> {
    Echo,
    Suppress,
    Emit(S),
}

/// What to do with one observed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch<S> {
    pub echo: bool,
    pub signals: Vec<S>,
}

#[derive(Debug, Clone)]
pub struct LineObserver<S> {
    rules: Vec<(LinePattern, LineAction<S>)>,
    echo_by_default: bool,
}

impl<S: Clone> LineObserver<S> {
    /// An observer that prints nothing unless a rule says so.
    pub fn quiet() -> Self {
        Self {
            rules: Vec::new(),
            echo_by_default: false,
        }
    }

    /// An observer that prints everything unless a rule suppresses it.
    pub fn verbose() -> Self {
        Self {
            rules: Vec::new(),
            echo_by_default: true,
        }
    }

    pub fn on(mut self, pattern: LinePattern, action: LineAction<S>) -> Self {
        self.rules.push((pattern, action));
        self
    }

    pub fn echo(self, pattern: LinePattern) -> Self {
        self.on(pattern, LineAction::Echo)
    }

    pub fn suppress(self, pattern: LinePattern) -> Self {
        self.on(pattern, LineAction::Suppress)
    }

    pub fn emit(self, pattern: LinePattern, signal: S) -> Self {
        self.on(pattern, LineAction::Emit(signal))
    }

    pub fn observe(&self, line: &str) -> Dispatch<S> {
        let mut echo = None;
        let mut signals = Vec::new();

        for (pattern, action) in &self.rules {
            if !pattern.matches(line) {
                continue;
            }
            match action {
                LineAction::Echo => {
                    echo.get_or_insert(true);
                }
                LineAction::Suppress => {
                    echo.get_or_insert(false);
                }
                LineAction::Emit(signal) => signals.push(signal.clone()),
            }
        }

        Dispatch {
            echo: echo.unwrap_or(self.echo_by_default),
            signals,
        }
    }
}
