//! Two dispatchers wired back to back over an in-memory queue pair.

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use anyhow::Result;
use rand::Rng;
use tracing_subscriber::EnvFilter;

use wirerpc::Marshaller;
use wirerpc::skeleton;
use wirerun::CallOptions;
use wirerun::Dispatcher;
use wirerun::DispatcherConfig;
use wirerun::Error;
use wirerun::Interface;
use wirerun::LocalFunction;
use wirerun::QueueTransport;
use wirerun::RemoteError;
use wirerun::RemoteFunction;
use wirerun::Version;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A serving responder and an initiator connected to it.
fn setup() -> Result<(Arc<Dispatcher>, Arc<Dispatcher>)> {
    init_tracing();
    let (client_end, server_end) = QueueTransport::pair();
    let wait = Duration::from_millis(20);

    let config = DispatcherConfig::default()
        .with_call_options(CallOptions::default().with_timeout(Duration::from_secs(10)));
    let server = Arc::new(Dispatcher::new(server_end.with_wait(wait)));
    let client = Arc::new(Dispatcher::with_config(client_end.with_wait(wait), config));
    server.serve()?;
    Ok((server, client))
}

fn math() -> Interface {
    Interface::new("Math", Version::new(1, 0))
}

fn remote_kind(err: &Error) -> Option<&str> {
    err.remote().map(|remote| remote.type_name.as_str())
}

#[derive(Debug)]
struct DivideByZero;

impl std::fmt::Display for DivideByZero {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "division by zero")
    }
}

// ============================================================================
//  ROUND TRIPS
// ============================================================================

#[test]
fn math_add_then_deregister() -> Result<()> {
    let (server, client) = setup()?;
    let add_fn = LocalFunction::bind(&server, &math(), "Add", |(a, b): (i32, i32)| a + b)?;
    let sub_fn = LocalFunction::bind(&server, &math(), "Sub", |(a, b): (i32, i32)| a - b)?;

    let add = RemoteFunction::<(i32, i32), i32>::new(&client, &math(), "Add");
    assert_eq!(add.call((2, 3))?, 5);

    drop(add_fn);
    let err = add.call((2, 3)).err().context("call after deregistration succeeded")?;
    assert_eq!(remote_kind(&err), Some(RemoteError::UNKNOWN_FUNCTION));

    drop(sub_fn);
    let err = add.call((2, 3)).err().context("call after interface removal succeeded")?;
    assert_eq!(remote_kind(&err), Some(RemoteError::UNKNOWN_INTERFACE));
    Ok(())
}

#[test]
fn remote_matches_local_invocation() -> Result<()> {
    let (server, client) = setup()?;
    let mix = |(a, b, s): (i64, u8, String)| format!("{s}:{}", a * i64::from(b));
    let _mix_fn = LocalFunction::bind(&server, &math(), "Mix", mix)?;
    let remote = RemoteFunction::<(i64, u8, String), String>::new(&client, &math(), "Mix");

    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let args = (
            rng.gen_range(-1_000_000i64..1_000_000),
            rng.gen_range(0u8..=u8::MAX),
            format!("k{}", rng.gen_range(0u32..1000)),
        );
        assert_eq!(remote.call(args.clone())?, mix(args));
    }
    Ok(())
}

#[test]
fn void_function_returns_unit() -> Result<()> {
    let (server, client) = setup()?;
    let _log = LocalFunction::bind(&server, &math(), "Log", |(_line,): (String,)| ())?;
    let log = RemoteFunction::<(String,), ()>::new(&client, &math(), "Log");
    log.call(("hello".to_string(),))?;
    Ok(())
}

#[test]
fn versions_are_distinct_interfaces() -> Result<()> {
    let (server, client) = setup()?;
    let v1 = math();
    let v2 = Interface::new("Math", Version::new(2, 0));
    let _one = LocalFunction::bind(&server, &v1, "Id", |(): ()| 1u16)?;
    let _two = LocalFunction::bind(&server, &v2, "Id", |(): ()| 2u16)?;

    assert_eq!(RemoteFunction::<(), u16>::new(&client, &v1, "Id").call(())?, 1);
    assert_eq!(RemoteFunction::<(), u16>::new(&client, &v2, "Id").call(())?, 2);

    let v3 = Interface::new("Math", Version::new(1, 1));
    let err = RemoteFunction::<(), u16>::new(&client, &v3, "Id")
        .call(())
        .err()
        .context("unknown version answered")?;
    assert_eq!(remote_kind(&err), Some(RemoteError::UNKNOWN_INTERFACE));
    Ok(())
}

// ============================================================================
//  FAILURES
// ============================================================================

#[test]
fn returned_error_propagates_as_remote() -> Result<()> {
    let (server, client) = setup()?;
    let _div = LocalFunction::bind_fallible(&server, &math(), "Div", |(a, b): (i32, i32)| {
        if b == 0 { Err(DivideByZero) } else { Ok(a / b) }
    })?;
    let div = RemoteFunction::<(i32, i32), i32>::new(&client, &math(), "Div");

    assert_eq!(div.call((9, 3))?, 3);

    let err = div.call((1, 0)).err().context("division by zero succeeded")?;
    let remote = err.remote().context("not a remote error")?;
    assert_eq!(remote.type_name, "DivideByZero");
    assert_eq!(remote.message, "division by zero");
    Ok(())
}

#[test]
fn panic_is_contained_and_server_keeps_serving() -> Result<()> {
    let (server, client) = setup()?;
    let _boom = LocalFunction::bind(&server, &math(), "Boom", |(): ()| -> i32 {
        panic!("responder blew up")
    })?;
    let _ok = LocalFunction::bind(&server, &math(), "Ok", |(): ()| 1i32)?;

    let err = RemoteFunction::<(), i32>::new(&client, &math(), "Boom")
        .call(())
        .err()
        .context("panicking call succeeded")?;
    let remote = err.remote().context("not a remote error")?;
    assert!(remote.is_kind(RemoteError::PANIC));
    assert_eq!(remote.message, "responder blew up");

    assert_eq!(RemoteFunction::<(), i32>::new(&client, &math(), "Ok").call(())?, 1);
    Ok(())
}

#[test]
fn mismatched_signature_is_answered_as_malformed() -> Result<()> {
    let (server, client) = setup()?;
    let _add = LocalFunction::bind(&server, &math(), "Add", |(a, b): (i32, i32)| a + b)?;

    // A stub built from a different signature than the one served.
    let stale = RemoteFunction::<(i32,), i32>::new(&client, &math(), "Add");
    let err = stale.call((1,)).err().context("arity mismatch succeeded")?;
    let remote = err.remote().context("not a remote error")?;
    assert!(remote.is_kind(RemoteError::MALFORMED_CALL));
    assert!(remote.message.contains("argument"));
    Ok(())
}

#[test]
fn foreign_protocol_version_fails_locally() -> Result<()> {
    let (_server, client) = setup()?;
    let mut request = client
        .marshaller()
        .encode_call(math().identity(), "Add", &(1i32, 2i32))?;
    request[0] = wirerpc::PROTOCOL_VERSION.wrapping_add(1);

    let err = client.call_remote(&request).err().context("foreign frame accepted")?;
    assert!(matches!(
        err,
        Error::Rpc(wirerpc::Error::ProtocolVersionMismatch { .. })
    ));
    Ok(())
}

// ============================================================================
//  CONCURRENCY
// ============================================================================

#[test]
fn concurrent_initiators_get_their_own_replies() -> Result<()> {
    let (server, client) = setup()?;
    let _echo = LocalFunction::bind(&server, &math(), "Echo", |(n,): (u64,)| n * 2)?;

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads as u64)
        .map(|t| {
            let echo = RemoteFunction::<(u64,), u64>::new(&client, &math(), "Echo");
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> wirerun::Result<()> {
                barrier.wait();
                for i in 0..25 {
                    let n = t * 1000 + i;
                    assert_eq!(echo.call((n,))?, n * 2);
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().map_err(|_| anyhow::anyhow!("initiator thread panicked"))??;
    }
    Ok(())
}

#[test]
fn duplicate_seq_is_refused_while_in_flight() -> Result<()> {
    let (server, client) = setup()?;
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let (s, r) = (Arc::clone(&started), Arc::clone(&release));
    let _hold = LocalFunction::bind(&server, &math(), "Hold", move |(n,): (u64,)| {
        s.wait();
        r.wait();
        n
    })?;

    // Fresh marshallers both start at the same seq.
    let first = Marshaller::new();
    let second = Marshaller::new();
    let first_request = first.encode_call(math().identity(), "Hold", &(5u64,))?;
    let second_request = second.encode_call(math().identity(), "Hold", &(6u64,))?;
    assert_eq!(first.peek_seq(&first_request)?, second.peek_seq(&second_request)?);

    let caller = {
        let client = Arc::clone(&client);
        thread::spawn(move || client.call_remote(&first_request))
    };
    started.wait();

    let err = client.call_remote(&second_request).err().context("duplicate seq accepted")?;
    assert!(matches!(err, Error::SeqInFlight(_)));
    release.wait();

    let reply = caller.join().map_err(|_| anyhow::anyhow!("caller panicked"))??;
    assert_eq!(first.decode_result::<u64>(&reply)?, 5);
    Ok(())
}

#[test]
fn separate_marshallers_never_swap_replies() -> Result<()> {
    let (server, client) = setup()?;
    let _id = LocalFunction::bind(&server, &math(), "Id", |(n,): (u64,)| n)?;

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2u64)
        .map(|t| {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<usize> {
                let marshaller = Marshaller::new();
                let mut refused = 0;
                for round in 0..20 {
                    let wanted = t * 100 + round;
                    let request = marshaller.encode_call(math().identity(), "Id", &(wanted,))?;
                    barrier.wait();
                    match client.call_remote(&request) {
                        Ok(reply) => assert_eq!(marshaller.decode_result::<u64>(&reply)?, wanted),
                        Err(Error::SeqInFlight(_)) => refused += 1,
                        Err(err) => return Err(err.into()),
                    }
                }
                Ok(refused)
            })
        })
        .collect();

    let mut refused = 0;
    for handle in handles {
        refused += handle.join().map_err(|_| anyhow::anyhow!("initiator thread panicked"))??;
    }
    assert!(refused < 40);
    Ok(())
}

#[test]
fn callable_may_register_during_invocation() -> Result<()> {
    let (server, client) = setup()?;
    let weak = Arc::downgrade(&server);
    let iface = math();
    let _install = LocalFunction::bind(&server, &math(), "Install", move |(name, k): (String, i32)| {
        let Some(server) = weak.upgrade() else {
            return false;
        };
        server
            .register_function(iface.identity(), &name, skeleton(move |(x,): (i32,)| x * k))
            .is_ok()
    })?;

    let install = RemoteFunction::<(String, i32), bool>::new(&client, &math(), "Install");
    assert!(install.call(("Triple".to_string(), 3))?);
    assert!(!install.call(("Triple".to_string(), 4))?);

    let triple = RemoteFunction::<(i32,), i32>::new(&client, &math(), "Triple");
    assert_eq!(triple.call((7,))?, 21);
    Ok(())
}

#[test]
fn independent_pairs_do_not_interfere() -> Result<()> {
    let (server_a, client_a) = setup()?;
    let (server_b, client_b) = setup()?;
    let _a = LocalFunction::bind(&server_a, &math(), "Who", |(): ()| 'a')?;
    let _b = LocalFunction::bind(&server_b, &math(), "Who", |(): ()| 'b')?;

    let who_a = RemoteFunction::<(), char>::new(&client_a, &math(), "Who");
    let who_b = RemoteFunction::<(), char>::new(&client_b, &math(), "Who");
    let left = thread::spawn(move || (0..20).map(|_| who_a.call(())).collect::<Vec<_>>());
    let right = thread::spawn(move || (0..20).map(|_| who_b.call(())).collect::<Vec<_>>());

    for reply in left.join().map_err(|_| anyhow::anyhow!("left panicked"))? {
        assert_eq!(reply?, 'a');
    }
    for reply in right.join().map_err(|_| anyhow::anyhow!("right panicked"))? {
        assert_eq!(reply?, 'b');
    }
    Ok(())
}

// ============================================================================
//  LIFECYCLE
// ============================================================================

#[test]
fn call_times_out_when_nobody_serves() -> Result<()> {
    init_tracing();
    let (client_end, _server_end) = QueueTransport::pair();
    let client = Arc::new(Dispatcher::new(client_end.with_wait(Duration::from_millis(10))));
    let add = RemoteFunction::<(i32, i32), i32>::new(&client, &math(), "Add");

    let options = CallOptions::default().with_timeout(Duration::from_millis(100));
    let err = add.call_with((1, 2), &options).err().context("call without server succeeded")?;
    assert!(matches!(err, Error::Timeout(_)));
    Ok(())
}

#[test]
fn shutdown_is_prompt_and_stops_answering() -> Result<()> {
    let (server, client) = setup()?;
    let _add = LocalFunction::bind(&server, &math(), "Add", |(a, b): (i32, i32)| a + b)?;
    let add = RemoteFunction::<(i32, i32), i32>::new(&client, &math(), "Add");
    assert_eq!(add.call((1, 1))?, 2);

    let started = Instant::now();
    server.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!server.is_serving());

    let options = CallOptions::default().with_timeout(Duration::from_millis(100));
    assert!(matches!(add.call_with((1, 1), &options), Err(Error::Timeout(_))));
    Ok(())
}

#[test]
fn callable_may_drop_the_last_dispatcher_handle() -> Result<()> {
    let (server, client) = setup()?;
    let weak = Arc::downgrade(&server);
    let holder: Arc<Mutex<Option<Arc<Dispatcher>>>> = Arc::new(Mutex::new(None));

    let slot = Arc::clone(&holder);
    server.register_function(
        math().identity(),
        "Release",
        skeleton(move |(): ()| {
            let last = slot.lock().map(|mut held| held.take()).unwrap_or(None);
            drop(last);
            7u8
        }),
    )?;
    *holder.lock().map_err(|_| anyhow::anyhow!("holder poisoned"))? = Some(server);

    let release = RemoteFunction::<(), u8>::new(&client, &math(), "Release");
    assert_eq!(release.call(())?, 7);
    assert!(weak.upgrade().is_none());

    // The loop stops after sending that reply.
    let options = CallOptions::default().with_timeout(Duration::from_millis(100));
    assert!(matches!(release.call_with((), &options), Err(Error::Timeout(_))));
    Ok(())
}

#[test]
fn dropping_local_function_after_dispatcher_is_harmless() -> Result<()> {
    let (server, _client) = setup()?;
    let add = LocalFunction::bind(&server, &math(), "Add", |(a, b): (i32, i32)| a + b)?;
    assert_eq!(add.name(), "Add");
    assert_eq!(add.interface(), math().identity());

    drop(server);
    drop(add);
    Ok(())
}

#[test]
fn raw_call_remote_roundtrip() -> Result<()> {
    let (server, client) = setup()?;
    server.register_function(math().identity(), "Add", skeleton(|(a, b): (i32, i32)| a + b))?;

    let marshaller = Marshaller::new();
    let request = marshaller.encode_call(math().identity(), "Add", &(20i32, 22i32))?;
    let reply = client.call_remote(&request)?;
    assert_eq!(marshaller.decode_result::<i32>(&reply)?, 42);

    server.deregister_function(math().identity(), "Add")?;
    assert!(matches!(
        server.deregister_function(math().identity(), "Add"),
        Err(Error::UnknownInterface(_))
    ));
    Ok(())
}
