//! Signal-driven graceful shutdown (spec.md §5, §9).
//!
//! Grounded on `original_source/lib/xfr_signal_set.hpp`'s broad signal set:
//! interrupt, terminate, abort, segv, fpe, ill, quit, hangup, bus, alarm,
//! cpu-limit, fsize-limit, broken-pipe all initiate the same graceful
//! shutdown sequence rather than killing the process outright.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::info;

/// Raw signal numbers on Linux for the handlers `tokio::signal::unix`
/// doesn't expose a named constructor for. Hardcoded rather than pulled in
/// via a `libc` dependency the rest of the crate has no other use for.
const SIGABRT: i32 = 6;
const SIGBUS: i32 = 7;
const SIGFPE: i32 = 8;
const SIGILL: i32 = 4;
const SIGSEGV: i32 = 11;
const SIGXCPU: i32 = 24;
const SIGXFSZ: i32 = 25;

/// Install handlers for the full named set and return a watch channel that
/// flips to `true` the moment any of them fires. The accept loop and every
/// in-flight request handler observe this at their next suspension point.
pub fn install() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut interrupt = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        let mut terminate = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut quit = signal(SignalKind::quit()).expect("install SIGQUIT handler");
        let mut hangup = signal(SignalKind::hangup()).expect("install SIGHUP handler");
        let mut alarm = signal(SignalKind::alarm()).expect("install SIGALRM handler");
        let mut pipe = signal(SignalKind::pipe()).expect("install SIGPIPE handler");
        let mut abort = signal(SignalKind::from_raw(SIGABRT)).expect("install SIGABRT handler");
        let mut bus = signal(SignalKind::from_raw(SIGBUS)).expect("install SIGBUS handler");
        let mut fpe = signal(SignalKind::from_raw(SIGFPE)).expect("install SIGFPE handler");
        let mut ill = signal(SignalKind::from_raw(SIGILL)).expect("install SIGILL handler");
        let mut segv = signal(SignalKind::from_raw(SIGSEGV)).expect("install SIGSEGV handler");
        let mut xcpu = signal(SignalKind::from_raw(SIGXCPU)).expect("install SIGXCPU handler");
        let mut xfsz = signal(SignalKind::from_raw(SIGXFSZ)).expect("install SIGXFSZ handler");

        let reason = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
            _ = quit.recv() => "SIGQUIT",
            _ = hangup.recv() => "SIGHUP",
            _ = alarm.recv() => "SIGALRM",
            _ = pipe.recv() => "SIGPIPE",
            _ = abort.recv() => "SIGABRT",
            _ = bus.recv() => "SIGBUS",
            _ = fpe.recv() => "SIGFPE",
            _ = ill.recv() => "SIGILL",
            _ = segv.recv() => "SIGSEGV",
            _ = xcpu.recv() => "SIGXCPU",
            _ = xfsz.recv() => "SIGXFSZ",
        };
        info!(signal = reason, "shutdown signal received, draining in-flight requests");
        let _ = tx.send(true);
    });

    rx
}
