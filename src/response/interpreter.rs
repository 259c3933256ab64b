//! Streaming tool-call interpreter.
//!
//! Fed one chunk at a time as the model streams. Text outside a tag pair is
//! handed back immediately for live display; a balanced tag pair becomes a
//! [`ToolCall`] the moment its closing tag arrives. A tag may straddle any
//! number of chunk boundaries, so detection runs over a persistent buffer
//! rather than the newest chunk alone.

use super::tool_tags::{find_opening_tag, parse_tool_call, partial_open_tag_len, ToolCall, ToolKind};

/// Output of one [`ToolCallInterpreter::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpreterEvent {
    /// Text outside any tag pair, unmodified.
    Text(String),
    /// A complete, validated tool call ready for dispatch.
    Call(ToolCall),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Inside(ToolKind),
}

/// Per-response interpreter state. One instance per in-flight request.
#[derive(Debug)]
pub struct ToolCallInterpreter {
    /// Idle: a held-back suffix that may grow into an opening tag.
    /// Inside: everything after the opening tag seen so far.
    buffer: String,
    state: State,
    dropped_calls: usize,
}

impl Default for ToolCallInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCallInterpreter {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            state: State::Idle,
            dropped_calls: 0,
        }
    }

    /// Whether an opening tag has been seen without its closing tag yet.
    pub fn is_inside_call(&self) -> bool {
        matches!(self.state, State::Inside(_))
    }

    /// Number of tag pairs that closed but failed validation.
    pub fn dropped_calls(&self) -> usize {
        self.dropped_calls
    }

    /// Advance by one chunk. Returns displayable text and completed calls in
    /// the order they appeared.
    pub fn push(&mut self, chunk: &str) -> Vec<InterpreterEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        loop {
            match self.state {
                State::Idle => match find_opening_tag(&self.buffer) {
                    Some((pos, kind)) => {
                        if pos > 0 {
                            events.push(InterpreterEvent::Text(self.buffer[..pos].to_string()));
                        }
                        self.buffer.drain(..pos + kind.open_tag().len());
                        self.state = State::Inside(kind);
                    }
                    None => {
                        let held = partial_open_tag_len(&self.buffer);
                        let emit_len = self.buffer.len() - held;
                        if emit_len > 0 {
                            let text: String = self.buffer.drain(..emit_len).collect();
                            events.push(InterpreterEvent::Text(text));
                        }
                        break;
                    }
                },
                State::Inside(kind) => {
                    let Some(close) = self.buffer.find(kind.close_tag()) else {
                        break;
                    };
                    let inner: String = self.buffer.drain(..close).collect();
                    self.buffer.drain(..kind.close_tag().len());
                    self.state = State::Idle;

                    match parse_tool_call(kind, &inner) {
                        Ok(call) => {
                            tracing::debug!(tool = kind.tag_name(), path = call.path(), "tool call recognized");
                            events.push(InterpreterEvent::Call(call));
                        }
                        Err(e) => {
                            self.dropped_calls += 1;
                            tracing::warn!(tool = kind.tag_name(), error = %e, "dropping malformed tool call");
                        }
                    }
                }
            }
        }

        events
    }

    /// End of stream. Flushes held-back idle text; an unterminated call is
    /// discarded without dispatch.
    pub fn finish(&mut self) -> Option<String> {
        let pending = std::mem::take(&mut self.buffer);
        let state = std::mem::replace(&mut self.state, State::Idle);

        match state {
            State::Idle if !pending.is_empty() => Some(pending),
            State::Idle => None,
            State::Inside(kind) => {
                self.dropped_calls += 1;
                tracing::warn!(
                    tool = kind.tag_name(),
                    buffered_bytes = pending.len(),
                    "stream ended inside an unterminated tool call"
                );
                None
            }
        }
    }

    /// Discard all state without emitting anything.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::Idle;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chunks: &[&str]) -> (Vec<InterpreterEvent>, Option<String>) {
        let mut interp = ToolCallInterpreter::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(interp.push(chunk));
        }
        let tail = interp.finish();
        (events, tail)
    }

    fn text_of(events: &[InterpreterEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                InterpreterEvent::Text(t) => Some(t.as_str()),
                InterpreterEvent::Call(_) => None,
            })
            .collect()
    }

    fn calls_of(events: &[InterpreterEvent]) -> Vec<ToolCall> {
        events
            .iter()
            .filter_map(|e| match e {
                InterpreterEvent::Call(c) => Some(c.clone()),
                InterpreterEvent::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_text_is_forwarded_immediately() {
        let mut interp = ToolCallInterpreter::new();
        assert_eq!(
            interp.push("Hello "),
            vec![InterpreterEvent::Text("Hello ".into())]
        );
        assert_eq!(
            interp.push("world"),
            vec![InterpreterEvent::Text("world".into())]
        );
        assert_eq!(interp.finish(), None);
    }

    #[test]
    fn test_single_chunk_read_call() {
        let (events, _) = run(&["Let me look. <read_file>src/main.rs</read_file> Done."]);
        assert_eq!(
            events,
            vec![
                InterpreterEvent::Text("Let me look. ".into()),
                InterpreterEvent::Call(ToolCall::ReadFile {
                    path: "src/main.rs".into()
                }),
                InterpreterEvent::Text(" Done.".into()),
            ]
        );
    }

    #[test]
    fn test_tag_split_across_chunks() {
        let (events, tail) = run(&["See <rea", "d_file>src/", "lib.rs</read", "_file>!"]);
        assert_eq!(
            calls_of(&events),
            vec![ToolCall::ReadFile {
                path: "src/lib.rs".into()
            }]
        );
        assert_eq!(text_of(&events), "See !");
        assert_eq!(tail, None);
    }

    #[test]
    fn test_write_call_with_content() {
        let (events, _) = run(&["<write_file>notes.md\n# Title\n", "body\n</write_file>"]);
        assert_eq!(
            calls_of(&events),
            vec![ToolCall::WriteFile {
                path: "notes.md".into(),
                content: "# Title\nbody".into()
            }]
        );
    }

    #[test]
    fn test_unterminated_call_dispatches_nothing() {
        let mut interp = ToolCallInterpreter::new();
        let events = interp.push("<open_file>app.py<");
        assert!(calls_of(&events).is_empty());
        assert!(interp.is_inside_call());
        assert_eq!(interp.finish(), None);
        assert_eq!(interp.dropped_calls(), 1);
        assert!(!interp.is_inside_call());
    }

    #[test]
    fn test_invalid_path_is_dropped_silently() {
        let (events, _) = run(&["<read_file>python app.py</read_file>after"]);
        assert!(calls_of(&events).is_empty());
        assert_eq!(text_of(&events), "after");
    }

    #[test]
    fn test_empty_call_is_dropped() {
        let mut interp = ToolCallInterpreter::new();
        let events = interp.push("<open_file>   </open_file>");
        assert!(events.is_empty());
        assert_eq!(interp.dropped_calls(), 1);
    }

    #[test]
    fn test_nested_opening_tag_is_not_reentrant() {
        // The second opening tag is part of the first call's inner text, which
        // then fails path validation.
        let (events, _) = run(&["<read_file><open_file>a.py</read_file>"]);
        assert!(calls_of(&events).is_empty());
    }

    #[test]
    fn test_held_back_prefix_flushed_on_finish() {
        let mut interp = ToolCallInterpreter::new();
        assert_eq!(interp.push("a < b and <wr"), vec![InterpreterEvent::Text("a < b and ".into())]);
        assert_eq!(interp.finish(), Some("<wr".into()));
    }

    #[test]
    fn test_lone_angle_bracket_resolves_on_next_chunk() {
        let (events, tail) = run(&["x <", "= y"]);
        assert_eq!(text_of(&events), "x <= y");
        assert_eq!(tail, None);
    }

    #[test]
    fn test_multiple_calls_in_order() {
        let (events, _) = run(&[
            "<open_file>a.rs</open_file><read_file>b.rs</read_file>",
        ]);
        let paths: Vec<String> = calls_of(&events).iter().map(|c| c.path().to_string()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn test_reset_discards_state() {
        let mut interp = ToolCallInterpreter::new();
        interp.push("<write_file>a.rs\nfn main()");
        interp.reset();
        assert!(!interp.is_inside_call());
        assert_eq!(interp.push("</write_file>"), vec![InterpreterEvent::Text("</write_file>".into())]);
    }
}
