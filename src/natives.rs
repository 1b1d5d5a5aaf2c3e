//! Root scope bindings for BeamScript
//!
//! The root environment holds `true`, `false` and the `con` console object:
//! `con.out.print`, `con.out.println` and `con.in`. All are constants.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::{BeamError, ErrorKind, Result};
use crate::value::{EnvRef, NativeFn, Object, Value};

/// Where console natives read from and write to
pub trait Console {
    fn write(&self, text: &str) -> io::Result<()>;

    /// One line without its terminator, or `None` at end of input
    fn read_line(&self) -> io::Result<Option<String>>;
}

/// Console backed by the process's stdin and stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write(&self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn read_line(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(trim_newline(line)))
    }
}

/// In-memory console with scripted input
#[derive(Debug, Default)]
pub struct BufferConsole {
    output: RefCell<String>,
    input: RefCell<VecDeque<String>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: RefCell::new(String::new()),
            input: RefCell::new(lines.into_iter().map(Into::into).collect()),
        }
    }

    /// Everything written so far
    pub fn output(&self) -> String {
        self.output.borrow().clone()
    }
}

impl Console for BufferConsole {
    fn write(&self, text: &str) -> io::Result<()> {
        self.output.borrow_mut().push_str(text);
        Ok(())
    }

    fn read_line(&self) -> io::Result<Option<String>> {
        Ok(self.input.borrow_mut().pop_front())
    }
}

fn trim_newline(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

fn console_error(err: io::Error) -> BeamError {
    BeamError::new(ErrorKind::Native(format!("console I/O failed: {}", err)), None)
}

fn join_args(args: &[Value]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a fresh root environment wired to `console`
pub fn create_global_env(console: Rc<dyn Console>) -> Result<EnvRef> {
    let env = Environment::new().into_ref();
    declare_globals(&env, console)?;
    tracing::trace!("root scope ready");
    Ok(env)
}

fn declare_globals(env: &EnvRef, console: Rc<dyn Console>) -> Result<()> {
    let mut out = Object::new();

    let sink = Rc::clone(&console);
    out.insert(
        "print",
        native("print", move |args, _| {
            sink.write(&join_args(args)).map_err(console_error)?;
            Ok(Value::Null)
        }),
    );

    let sink = Rc::clone(&console);
    out.insert(
        "println",
        native("println", move |args, _| {
            sink.write(&format!("{}\n", join_args(args)))
                .map_err(console_error)?;
            Ok(Value::Null)
        }),
    );

    let mut con = Object::new();
    con.insert("out", Value::Object(Rc::new(out)));
    con.insert(
        "in",
        native("in", move |args, _| {
            if let Some(prompt) = args.first() {
                console.write(&prompt.to_string()).map_err(console_error)?;
            }
            Ok(match console.read_line().map_err(console_error)? {
                Some(line) => Value::String(line),
                None => Value::Null,
            })
        }),
    );

    let mut scope = env.borrow_mut();
    scope.declare("true", Value::Boolean(true), true)?;
    scope.declare("false", Value::Boolean(false), true)?;
    scope.declare("con", Value::Object(Rc::new(con)), true)?;
    Ok(())
}

fn native(name: &str, func: impl Fn(&[Value], &EnvRef) -> Result<Value> + 'static) -> Value {
    Value::NativeFunction(Rc::new(NativeFn::new(name, func)))
}
