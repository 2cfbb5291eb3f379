//! Read-only projections of well-known tuples.
//!
//! Views borrow the parsed tuple and expose its fields by meaning. A field
//! missing from the tuple, or present with an unexpected shape, reads as
//! `None`.

use crate::error::ValueError;
use crate::value::{List, Tuple, Value};

fn fields_of(value: &Value) -> Result<&Tuple, ValueError> {
    value
        .as_tuple()
        .ok_or_else(|| ValueError::NotATuple(value.kind()))
}

fn text<'a>(fields: &'a Tuple, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

fn number<T: std::str::FromStr>(fields: &Tuple, key: &str) -> Option<T> {
    fields.get(key).and_then(|value| value.parse())
}

fn flag(fields: &Tuple, key: &str) -> Option<bool> {
    match text(fields, key)? {
        "y" => Some(true),
        "n" => Some(false),
        _ => None,
    }
}

fn list<'a>(fields: &'a Tuple, key: &str) -> Option<&'a List> {
    fields.get(key).and_then(Value::as_list)
}

/// A breakpoint, watchpoint, tracepoint or catchpoint description.
#[derive(Debug, Clone, Copy)]
pub struct Breakpoint<'a> {
    fields: &'a Tuple,
}

impl<'a> Breakpoint<'a> {
    /// Project a `bkpt={...}` value.
    pub fn new(value: &'a Value) -> Result<Self, ValueError> {
        fields_of(value).map(|fields| Self { fields })
    }

    /// Raw field lookup.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }

    /// Breakpoint number. Locations of a multi-location breakpoint use `N.M`.
    pub fn number(&self) -> Option<&'a str> {
        text(self.fields, "number")
    }

    /// `breakpoint`, `watchpoint`, `catchpoint` and so on.
    pub fn kind(&self) -> Option<&'a str> {
        text(self.fields, "type")
    }

    pub fn catch_type(&self) -> Option<&'a str> {
        text(self.fields, "catch-type")
    }

    /// `keep` or `del`.
    pub fn disposition(&self) -> Option<&'a str> {
        text(self.fields, "disp")
    }

    pub fn enabled(&self) -> Option<bool> {
        flag(self.fields, "enabled")
    }

    /// Hex address, `<PENDING>` or `<MULTIPLE>`.
    pub fn address(&self) -> Option<&'a str> {
        text(self.fields, "addr")
    }

    pub fn address_flags(&self) -> Option<&'a str> {
        text(self.fields, "addr_flags")
    }

    pub fn function(&self) -> Option<&'a str> {
        text(self.fields, "func")
    }

    /// Source file name, from `file` or `filename`.
    pub fn filename(&self) -> Option<&'a str> {
        text(self.fields, "file").or_else(|| text(self.fields, "filename"))
    }

    pub fn fullname(&self) -> Option<&'a str> {
        text(self.fields, "fullname")
    }

    pub fn line(&self) -> Option<u32> {
        number(self.fields, "line")
    }

    pub fn at(&self) -> Option<&'a str> {
        text(self.fields, "at")
    }

    /// The location text of a pending breakpoint.
    pub fn pending(&self) -> Option<&'a str> {
        text(self.fields, "pending")
    }

    /// `host` or `target`.
    pub fn evaluated_by(&self) -> Option<&'a str> {
        text(self.fields, "evaluated-by")
    }

    pub fn thread(&self) -> Option<&'a str> {
        text(self.fields, "thread")
    }

    pub fn thread_groups(&self) -> Option<&'a List> {
        list(self.fields, "thread-groups")
    }

    pub fn task(&self) -> Option<&'a str> {
        text(self.fields, "task")
    }

    pub fn condition(&self) -> Option<&'a str> {
        text(self.fields, "cond")
    }

    pub fn ignore_count(&self) -> Option<u32> {
        number(self.fields, "ignore")
    }

    pub fn enable_count(&self) -> Option<u32> {
        number(self.fields, "enable")
    }

    /// Tracepoint pass count.
    pub fn pass_count(&self) -> Option<u32> {
        number(self.fields, "pass")
    }

    /// Number of times the breakpoint has been hit.
    pub fn hit_count(&self) -> Option<u32> {
        number(self.fields, "times")
    }

    /// Whether a tracepoint is installed on the target.
    pub fn installed(&self) -> Option<bool> {
        flag(self.fields, "installed")
    }

    pub fn locations(&self) -> Option<&'a List> {
        list(self.fields, "locations")
    }
}

/// A stack frame description.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    fields: &'a Tuple,
}

impl<'a> Frame<'a> {
    /// Project a `frame={...}` value.
    pub fn new(value: &'a Value) -> Result<Self, ValueError> {
        fields_of(value).map(|fields| Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }

    /// Frame level, 0 being the innermost.
    pub fn level(&self) -> Option<u32> {
        number(self.fields, "level")
    }

    pub fn function(&self) -> Option<&'a str> {
        text(self.fields, "func")
    }

    /// Function arguments, each a `{name=..,value=..}` tuple.
    pub fn args(&self) -> Option<&'a List> {
        list(self.fields, "args")
    }

    pub fn address(&self) -> Option<&'a str> {
        text(self.fields, "addr")
    }

    pub fn address_flags(&self) -> Option<&'a str> {
        text(self.fields, "addr_flags")
    }

    pub fn filename(&self) -> Option<&'a str> {
        text(self.fields, "file").or_else(|| text(self.fields, "filename"))
    }

    pub fn fullname(&self) -> Option<&'a str> {
        text(self.fields, "fullname")
    }

    pub fn line(&self) -> Option<u32> {
        number(self.fields, "line")
    }

    /// Shared library the frame's code comes from.
    pub fn library(&self) -> Option<&'a str> {
        text(self.fields, "from")
    }
}

/// A thread description from `-thread-info`.
#[derive(Debug, Clone, Copy)]
pub struct Thread<'a> {
    fields: &'a Tuple,
}

impl<'a> Thread<'a> {
    pub fn new(value: &'a Value) -> Result<Self, ValueError> {
        fields_of(value).map(|fields| Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }

    /// Debugger-assigned thread number.
    pub fn id(&self) -> Option<u32> {
        number(self.fields, "id")
    }

    /// Target-specific thread name, e.g. `Thread 0xb7e14b90 (LWP 21257)`.
    pub fn target_id(&self) -> Option<&'a str> {
        text(self.fields, "target-id")
    }

    pub fn details(&self) -> Option<&'a str> {
        text(self.fields, "details")
    }

    pub fn name(&self) -> Option<&'a str> {
        text(self.fields, "name")
    }

    /// `stopped` or `running`.
    pub fn state(&self) -> Option<&'a str> {
        text(self.fields, "state")
    }

    /// Current frame; absent while the thread is running.
    pub fn frame(&self) -> Option<Frame<'a>> {
        self.fields
            .get("frame")
            .and_then(|value| Frame::new(value).ok())
    }

    pub fn core(&self) -> Option<u32> {
        number(self.fields, "core")
    }
}
