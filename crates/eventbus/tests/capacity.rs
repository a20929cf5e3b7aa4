use eventbus_core::{Configuration, EventBus, ListenerBuilder};

struct Tick;

fn build_listener() -> eventbus_core::Listener {
    ListenerBuilder::new()
        .on::<Tick>()
        .primary(|_| Ok(()))
        .register()
        .unwrap()
        .build()
}

#[test]
fn registration_beyond_the_configured_cap_is_rejected() {
    let bus = EventBus::with_config(Configuration {
        max_subscribers_per_event: 1,
        ..Configuration::default()
    });

    bus.register(build_listener()).unwrap();
    let result = bus.register(build_listener());

    assert!(result.is_err());
}

#[test]
fn unregistering_frees_a_capacity_slot() {
    let bus = EventBus::with_config(Configuration {
        max_subscribers_per_event: 1,
        ..Configuration::default()
    });

    let id = bus.register(build_listener()).unwrap();
    bus.unregister(&id).unwrap();

    assert!(bus.register(build_listener()).is_ok());
}
