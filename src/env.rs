use std::{cell::RefCell, ffi::OsStr};

#[derive(Clone, Copy, Debug)]
struct Env {
    trace_enabled: bool,
    step_limit: Option<u64>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Read configuration from the process environment. Must be called once, before any getter.
pub fn init() {
    let value = Env {
        trace_enabled: var_is("LMINC_TRACE", "1"),
        step_limit: parse_step_limit(std::env::var("LMINC_STEP_LIMIT").ok().as_deref()),
    };
    set_env(value);
}

/// `LMINC_TRACE=1`
pub fn is_trace_enabled() -> bool {
    with_env(|env| env.trace_enabled)
}

/// `LMINC_STEP_LIMIT=<n>`
pub fn step_limit() -> Option<u64> {
    with_env(|env| env.step_limit)
}

/// Unset, empty, zero and unparseable values all mean no limit.
fn parse_step_limit(value: Option<&str>) -> Option<u64> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&limit| limit > 0)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}
