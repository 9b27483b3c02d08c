//! The evaluation environment
//!
//! One global namespace shared by every cell and fragment of a session, plus a stack of transient frames for
//! function calls and comprehensions. Globals are never reset between execution phases.

use indexmap::IndexMap;

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Function,
    /// Holds only the comprehension's loop variables; lookups fall through to the enclosing frame
    Comprehension,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    vars: IndexMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct Environment {
    globals: IndexMap<String, Value>,
    frames: Vec<Frame>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` through the visible frames, then globals.
    pub fn get(&self, name: &str) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.vars.get(name) {
                return Some(v.clone());
            }
            if frame.kind == FrameKind::Function {
                break;
            }
        }
        self.globals.get(name).cloned()
    }

    /// Bind in the innermost frame, or globally at top level.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.vars.insert(name.into(), value);
            }
            None => {
                self.globals.insert(name.into(), value);
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        match self.frames.last_mut() {
            Some(frame) => frame.vars.shift_remove(name),
            None => self.globals.shift_remove(name),
        }
    }

    pub fn push_frame(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            vars: IndexMap::new(),
        });
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    pub fn globals(&self) -> &IndexMap<String, Value> {
        &self.globals
    }

    /// Global names, sorted; used for "did you mean" style reporting.
    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.globals.keys().cloned().collect();
        names.sort();
        names
    }
}
