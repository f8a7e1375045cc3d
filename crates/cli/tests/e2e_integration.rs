//! End-to-end integration tests for the Rolecast DCI runtime.
//!
//! These tests exercise the full pipeline from context definition through
//! instantiation, role binding, role dispatch and unbinding, including
//! nested interactions, cross-context stacking and multiplayer roles.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use rolecast_config::AppConfig;
use rolecast_core::{
    Bindings, ContextType, DciError, Multiplayer, PlayerRef, ReentrancyMode, RoleMethods, Value,
};

// ── Fixtures ─────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Account {
    balance: i64,
}

#[derive(Debug, thiserror::Error)]
#[error("overdrawn by {0}")]
struct Overdrawn(i64);

fn name_of(player: &PlayerRef) -> String {
    player.with(|name: &String| name.clone()).unwrap()
}

/// A context whose `host` role greets the `guest` role.
fn greeting() -> ContextType {
    ContextType::builder("Greeting")
        .role(
            "host",
            RoleMethods::new()
                .public("greet", |scope, _| {
                    let guest = scope.mate_player("guest")?;
                    let line = scope.call("phrase", &[Value::from(name_of(&guest))])?;
                    Ok(line)
                })
                .private("phrase", |_, args| {
                    let name = args.first().and_then(Value::as_str).unwrap_or("stranger");
                    Ok(Value::from(format!("welcome, {name}")))
                }),
        )
        .unwrap()
        .role(
            "guest",
            RoleMethods::new().public("reply", |scope, _| {
                let host = scope.mate_player("host")?;
                Ok(Value::from(format!("thanks, {}", name_of(&host))))
            }),
        )
        .unwrap()
        .interaction("run", |scene, _| {
            let host = scene.player("host")?;
            let guest = scene.player("guest")?;
            let greeting = host.send("greet", &[])?;
            let reply = guest.send("reply", &[])?;
            Ok(Value::from(format!(
                "{} / {}",
                greeting.as_str().unwrap_or_default(),
                reply.as_str().unwrap_or_default()
            )))
        })
        .unwrap()
        .interaction("fail", |scene, _| {
            scene.player("host")?.send("greet", &[])?;
            Err(Overdrawn(5).into())
        })
        .unwrap()
        .interaction("explode", |_, _| panic!("interaction panicked"))
        .unwrap()
        .build()
}

fn greeting_bindings(host: &PlayerRef, guest: &PlayerRef) -> Bindings {
    Bindings::new().bind("host", host).bind("guest", guest)
}

/// The classic money transfer, with the amount passed as a setting.
fn transfer() -> ContextType {
    ContextType::builder("Transfer")
        .role(
            "source",
            RoleMethods::new().public("withdraw", |scope, _| {
                let amount = scope.setting("amount").and_then(|v| v.as_i64()).unwrap_or(0);
                scope.me().with_mut(|account: &mut Account| -> Result<(), Overdrawn> {
                    if account.balance < amount {
                        return Err(Overdrawn(amount - account.balance));
                    }
                    account.balance -= amount;
                    Ok(())
                })??;
                scope.mate_player("target")?.send("deposit", &[Value::from(amount)])
            }),
        )
        .unwrap()
        .role(
            "target",
            RoleMethods::new().public("deposit", |scope, args| {
                let amount = args.first().and_then(Value::as_i64).unwrap_or(0);
                scope
                    .me()
                    .with_mut(|account: &mut Account| account.balance += amount)?;
                Ok(Value::Unit)
            }),
        )
        .unwrap()
        .interaction("run", |scene, _| scene.player("source")?.send("withdraw", &[]))
        .unwrap()
        .build()
}

fn balance(player: &PlayerRef) -> i64 {
    player.with(|account: &Account| account.balance).unwrap()
}

// ── Schema & instantiation ───────────────────────────────────────────────

#[test]
fn e2e_roles_size_matches_declarations() {
    let kind = greeting();
    assert_eq!(kind.roles().len(), 2);
    assert!(kind.roles().contains("host"));
    assert!(kind.roles().contains("guest"));
    assert!(kind.has_interaction("run"));
    assert!(!kind.has_interaction("missing"));
}

#[test]
fn e2e_missing_roles_lists_every_unbound_key() {
    let kind = ContextType::builder("Trio")
        .role("a", RoleMethods::new())
        .unwrap()
        .role("b", RoleMethods::new())
        .unwrap()
        .role("c", RoleMethods::new())
        .unwrap()
        .build();

    let a = PlayerRef::new(1_i64);
    let err = kind
        .instantiate(Bindings::new().bind("a", &a).set("extra", 3))
        .unwrap_err();

    assert_eq!(err, DciError::MissingRoles(vec!["b".into(), "c".into()]));
    assert_eq!(err.to_string(), "missing roles [b, c]");
}

#[test]
fn e2e_invalid_role_key_rejected_at_definition() {
    let err = ContextType::builder("Bad")
        .role("not a key", RoleMethods::new())
        .err()
        .unwrap();
    assert!(matches!(err, DciError::InvalidRoleKey { .. }));
}

// ── Capability symmetry ──────────────────────────────────────────────────

#[test]
fn e2e_roles_exist_only_during_the_interaction() {
    let host = PlayerRef::new("Ana".to_string());
    let guest = PlayerRef::new("Bo".to_string());
    let observed = Rc::new(RefCell::new(Vec::new()));

    let seen = Rc::clone(&observed);
    let kind = ContextType::builder("Probe")
        .role("host", RoleMethods::new().public("greet", |_, _| Ok(Value::Unit)))
        .unwrap()
        .role("guest", RoleMethods::new().public("reply", |_, _| Ok(Value::Unit)))
        .unwrap()
        .interaction("run", move |scene, _| {
            let host = scene.player("host")?;
            let guest = scene.player("guest")?;
            seen.borrow_mut().push((
                host.responds_to("greet"),
                guest.responds_to("reply"),
                host.responds_to("reply"),
            ));
            Ok(Value::Unit)
        })
        .unwrap()
        .build();

    assert!(!host.responds_to("greet"));
    assert!(!guest.responds_to("reply"));

    kind.call(greeting_bindings(&host, &guest), &[]).unwrap();

    assert_eq!(*observed.borrow(), vec![(true, true, false)]);
    assert!(!host.responds_to("greet"));
    assert!(!guest.responds_to("reply"));
    assert_eq!(host.role_depth(), 0);
    assert_eq!(guest.role_depth(), 0);
}

#[test]
fn e2e_greeting_uses_mates_and_private_helpers() {
    let host = PlayerRef::new("Ana".to_string());
    let guest = PlayerRef::new("Bo".to_string());

    let result = greeting()
        .call(greeting_bindings(&host, &guest), &[])
        .unwrap();

    assert_eq!(result.as_str(), Some("welcome, Bo / thanks, Ana"));
}

#[test]
fn e2e_body_error_passes_through_and_roles_are_removed() {
    let host = PlayerRef::new("Ana".to_string());
    let guest = PlayerRef::new("Bo".to_string());
    let context = greeting()
        .instantiate(greeting_bindings(&host, &guest))
        .unwrap();

    let err = context.interact("fail", &[]).unwrap_err();

    let overdrawn = err.downcast_ref::<Overdrawn>().expect("domain error unchanged");
    assert_eq!(overdrawn.0, 5);
    assert!(!host.responds_to("greet"));
    assert_eq!(host.role_depth(), 0);
    assert!(!context.is_active());
}

#[test]
fn e2e_panic_in_interaction_still_unbinds() {
    let host = PlayerRef::new("Ana".to_string());
    let guest = PlayerRef::new("Bo".to_string());
    let context = greeting()
        .instantiate(greeting_bindings(&host, &guest))
        .unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| context.interact("explode", &[])));

    assert!(outcome.is_err());
    assert_eq!(host.role_depth(), 0);
    assert_eq!(guest.role_depth(), 0);
    assert!(!context.is_active());
}

#[test]
fn e2e_sending_outside_an_interaction_is_an_engine_error() {
    let host = PlayerRef::new("Ana".to_string());
    let err = host.send("greet", &[]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DciError>(),
        Some(DciError::NoMethod { .. })
    ));
}

// ── Privacy ──────────────────────────────────────────────────────────────

#[test]
fn e2e_private_methods_are_hidden_from_outside() {
    let host = PlayerRef::new("Ana".to_string());
    let guest = PlayerRef::new("Bo".to_string());
    let probe = Rc::new(RefCell::new(None));

    let slot = Rc::clone(&probe);
    let kind = ContextType::builder("Private")
        .role(
            "host",
            RoleMethods::new()
                .public("greet", |scope, _| scope.call("secret", &[]))
                .private("secret", |_, _| Ok(Value::from("psst"))),
        )
        .unwrap()
        .role("guest", RoleMethods::new())
        .unwrap()
        .interaction("run", move |scene, _| {
            let host = scene.player("host")?;
            let direct = host.send("secret", &[]);
            *slot.borrow_mut() = Some((
                host.responds_to("secret"),
                direct.map_err(|e| e.downcast_ref::<DciError>().cloned()),
            ));
            host.send("greet", &[])
        })
        .unwrap()
        .build();

    let result = kind.call(greeting_bindings(&host, &guest), &[]).unwrap();
    assert_eq!(result.as_str(), Some("psst"));

    let (responds, direct) = probe.borrow_mut().take().unwrap();
    assert!(!responds);
    assert!(matches!(
        direct,
        Err(Some(DciError::PrivateMethod { .. }))
    ));
}

#[test]
fn e2e_mate_outside_schema_is_rejected() {
    let host = PlayerRef::new("Ana".to_string());
    let guest = PlayerRef::new("Bo".to_string());

    let kind = ContextType::builder("Lonely")
        .role(
            "host",
            RoleMethods::new().public("peek", |scope, _| {
                scope.mate("stranger")?;
                Ok(Value::Unit)
            }),
        )
        .unwrap()
        .role("guest", RoleMethods::new())
        .unwrap()
        .interaction("run", |scene, _| scene.player("host")?.send("peek", &[]))
        .unwrap()
        .build();

    let err = kind.call(greeting_bindings(&host, &guest), &[]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DciError>(),
        Some(DciError::NoMateRole { .. })
    ));
}

// ── Reentrancy ───────────────────────────────────────────────────────────

fn nested_probe(mode: ReentrancyMode, depths: Rc<RefCell<Vec<usize>>>) -> ContextType {
    let outer = Rc::clone(&depths);
    let inner = depths;
    ContextType::builder("Nested")
        .role("worker", RoleMethods::new().public("work", |_, _| Ok(Value::Unit)))
        .unwrap()
        .interaction("outer", move |scene, _| {
            outer.borrow_mut().push(scene.player("worker")?.role_depth());
            scene.interact("inner", &[])?;
            outer.borrow_mut().push(scene.player("worker")?.role_depth());
            Ok(Value::Unit)
        })
        .unwrap()
        .interaction("inner", move |scene, _| {
            let worker = scene.player("worker")?;
            inner.borrow_mut().push(worker.role_depth());
            worker.send("work", &[])
        })
        .unwrap()
        .reentrancy(mode)
        .build()
}

#[test]
fn e2e_nested_interaction_does_not_rebind() {
    for mode in [ReentrancyMode::DepthCounter, ReentrancyMode::FirstRole] {
        let depths = Rc::new(RefCell::new(Vec::new()));
        let worker = PlayerRef::new(0_u8);
        let context = nested_probe(mode, Rc::clone(&depths))
            .instantiate(Bindings::new().bind("worker", &worker))
            .unwrap();

        context.interact("outer", &[]).unwrap();

        assert_eq!(*depths.borrow(), vec![1, 1, 1], "mode {mode}");
        assert_eq!(worker.role_depth(), 0, "mode {mode}");
        assert_eq!(worker.allocated_layers(), 1, "mode {mode}");
    }
}

#[test]
fn e2e_cross_context_stacking_restores_outer_role() {
    let inner_kind = ContextType::builder("Inner")
        .role(
            "b",
            RoleMethods::new()
                .public("describe", |_, _| Ok(Value::from("b")))
                .public("only_b", |_, _| Ok(Value::Unit)),
        )
        .unwrap()
        .interaction("run", |scene, _| {
            let x = scene.player("b")?;
            let inside = x.send("describe", &[])?;
            Ok(Value::from(format!(
                "{}:{}:{}",
                inside.as_str().unwrap_or_default(),
                x.role_depth(),
                x.responds_to("only_a")
            )))
        })
        .unwrap()
        .build();

    let log = Rc::new(RefCell::new(Vec::new()));
    let record = Rc::clone(&log);
    let outer_kind = ContextType::builder("Outer")
        .role(
            "a",
            RoleMethods::new()
                .public("describe", |_, _| Ok(Value::from("a")))
                .public("only_a", |_, _| Ok(Value::Unit)),
        )
        .unwrap()
        .interaction("run", move |scene, _| {
            let x = scene.player("a")?;
            let nested = inner_kind.call(Bindings::new().bind("b", &x), &[])?;
            let after = x.send("describe", &[])?;
            let mut log = record.borrow_mut();
            log.push(nested.as_str().unwrap_or_default().to_string());
            log.push(after.as_str().unwrap_or_default().to_string());
            log.push(x.responds_to("only_b").to_string());
            log.push(x.role_depth().to_string());
            Ok(Value::Unit)
        })
        .unwrap()
        .build();

    let x = PlayerRef::new("X".to_string());
    outer_kind.call(Bindings::new().bind("a", &x), &[]).unwrap();

    assert_eq!(*log.borrow(), vec!["b:2:true", "a", "false", "1"]);
    assert_eq!(x.role_depth(), 0);
    assert_eq!(x.allocated_layers(), 2);
}

// ── Multiplayer ──────────────────────────────────────────────────────────

#[test]
fn e2e_multiplayer_role_reaches_every_member() {
    let members: Vec<PlayerRef> = (0..4).map(|i| PlayerRef::new(Account { balance: i })).collect();
    let crowd = Multiplayer::new(members.clone());

    let kind = ContextType::builder("Payday")
        .role(
            "staff",
            RoleMethods::new().public("pay", |scope, args| {
                let bonus = args.first().and_then(Value::as_i64).unwrap_or(0);
                scope.me().with_mut(|a: &mut Account| a.balance += bonus)?;
                Ok(Value::Unit)
            }),
        )
        .unwrap()
        .interaction("run", |scene, _| {
            let staff = scene.group("staff")?;
            let mut answering = 0;
            for member in &staff {
                if member.responds_to("pay") {
                    answering += 1;
                }
                member.send("pay", &[Value::from(10)])?;
            }
            let last = staff.at(-1).map(balance).unwrap_or_default();
            Ok(Value::from(serde_json::json!({
                "answering": answering,
                "first": balance(&staff[0]),
                "last": last,
            })))
        })
        .unwrap()
        .build();

    let result = kind
        .call(Bindings::new().bind("staff", crowd.clone()), &[])
        .unwrap();

    let data = result.as_data().unwrap();
    assert_eq!(data["answering"], 4);
    assert_eq!(data["first"], 10);
    assert_eq!(data["last"], 13);
    for member in &members {
        assert!(!member.responds_to("pay"));
        assert_eq!(member.role_depth(), 0);
    }
    assert_eq!(crowd.len(), 4);
}

#[test]
fn e2e_multiplayer_is_rejected_where_a_player_is_expected() {
    let crowd = Multiplayer::new([PlayerRef::new(1_u8)]);
    let kind = ContextType::builder("Single")
        .role("one", RoleMethods::new())
        .unwrap()
        .interaction("run", |scene, _| Ok(Value::from(scene.player("one")?)))
        .unwrap()
        .build();

    let err = kind.call(Bindings::new().bind("one", crowd), &[]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DciError>(),
        Some(DciError::WrongCast { .. })
    ));
}

// ── Mates & settings ─────────────────────────────────────────────────────

#[test]
fn e2e_mates_are_wired_both_ways() {
    let kind = ContextType::builder("Triangle")
        .role(
            "a",
            RoleMethods::new().public("names", |scope, _| {
                let b = name_of(&scope.mate_player("b")?);
                let c = name_of(&scope.mate_player("c")?);
                Ok(Value::from(format!("{b}{c}")))
            }),
        )
        .unwrap()
        .role(
            "b",
            RoleMethods::new().public("names", |scope, _| {
                Ok(Value::from(name_of(&scope.mate_player("a")?)))
            }),
        )
        .unwrap()
        .role("c", RoleMethods::new())
        .unwrap()
        .interaction("run", |scene, _| {
            let from_a = scene.player("a")?.send("names", &[])?;
            let from_b = scene.player("b")?.send("names", &[])?;
            Ok(Value::from(format!(
                "{}|{}",
                from_a.as_str().unwrap_or_default(),
                from_b.as_str().unwrap_or_default()
            )))
        })
        .unwrap()
        .build();

    for key in ["a", "b", "c"] {
        let role = kind.role(key).unwrap();
        for other in ["a", "b", "c"] {
            assert_eq!(role.has_mate(other), key != other, "{key} -> {other}");
        }
    }

    let bindings = ["a", "b", "c"]
        .into_iter()
        .map(|key| (key, PlayerRef::new(key.to_uppercase())))
        .collect::<Bindings>();
    let result = kind.call(bindings, &[]).unwrap();
    assert_eq!(result.as_str(), Some("BC|A"));
}

#[test]
fn e2e_settings_snapshot_one_and_many() {
    let seen = Rc::new(Cell::new(0_usize));
    let count = Rc::clone(&seen);
    let kind = ContextType::builder("Configured")
        .role(
            "reader",
            RoleMethods::new().public("read", |scope, _| {
                Ok(scope.setting("s2").unwrap_or_default())
            }),
        )
        .unwrap()
        .interaction("run", move |scene, _| {
            count.set(scene.settings().len());
            scene.player("reader")?.send("read", &[])
        })
        .unwrap()
        .build();

    let reader = PlayerRef::new(());
    let context = kind
        .instantiate(
            Bindings::new()
                .bind("reader", &reader)
                .set("s1", 1)
                .set("s2", "two")
                .set("s3", true),
        )
        .unwrap();

    let all = context.settings();
    assert_eq!(all.keys().map(String::as_str).collect::<Vec<_>>(), vec!["s1", "s2", "s3"]);
    assert_eq!(context.setting("s1").and_then(|v| v.as_i64()), Some(1));
    assert!(context.setting("reader").is_none());

    let some = context.settings_of(&["s1", "s3", "absent"]);
    assert_eq!(some.len(), 2);
    assert_eq!(some["s3"].as_bool(), Some(true));

    assert_eq!(context.run(&[]).unwrap().as_str(), Some("two"));
    assert_eq!(seen.get(), 3);
}

// ── Money transfer ───────────────────────────────────────────────────────

#[test]
fn e2e_money_transfer_moves_funds() {
    let source = PlayerRef::new(Account { balance: 1000 });
    let target = PlayerRef::new(Account { balance: 0 });
    let kind = transfer();

    kind.call(
        Bindings::new()
            .bind("source", &source)
            .bind("target", &target)
            .set("amount", 200),
        &[],
    )
    .unwrap();

    assert_eq!(balance(&source), 800);
    assert_eq!(balance(&target), 200);
    assert!(!source.responds_to("withdraw"));
    assert!(!target.responds_to("deposit"));
}

#[test]
fn e2e_repeated_transfers_reuse_capability_layers() {
    let source = PlayerRef::new(Account { balance: 1000 });
    let target = PlayerRef::new(Account { balance: 0 });
    let kind = transfer();

    for _ in 0..5 {
        kind.call(
            Bindings::new()
                .bind("source", &source)
                .bind("target", &target)
                .set("amount", 200),
            &[],
        )
        .unwrap();
    }

    assert_eq!(balance(&source), 0);
    assert_eq!(balance(&target), 1000);
    assert_eq!(source.allocated_layers(), 1);
    assert_eq!(target.allocated_layers(), 1);

    let err = kind
        .call(
            Bindings::new()
                .bind("source", &source)
                .bind("target", &target)
                .set("amount", 200),
            &[],
        )
        .unwrap_err();
    assert_eq!(err.downcast_ref::<Overdrawn>().map(|o| o.0), Some(200));
    assert_eq!(balance(&target), 1000);
    assert_eq!(source.role_depth(), 0);
}

// ── Configuration ────────────────────────────────────────────────────────

#[test]
fn e2e_config_selects_reentrancy_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[runtime]\nreentrancy = \"first_role\"\n").unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.runtime.reentrancy, ReentrancyMode::FirstRole);

    let depths = Rc::new(RefCell::new(Vec::new()));
    let worker = PlayerRef::new(0_u8);
    let kind = nested_probe(config.runtime.reentrancy, Rc::clone(&depths));
    assert_eq!(kind.reentrancy(), ReentrancyMode::FirstRole);

    kind.instantiate(Bindings::new().bind("worker", &worker))
        .unwrap()
        .interact("outer", &[])
        .unwrap();
    assert_eq!(*depths.borrow(), vec![1, 1, 1]);
}
