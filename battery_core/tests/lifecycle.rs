//! Bring-up/teardown ordering and cleanup on partial failure.
//!
//! Every test asserts the exact sequence of collaborator calls, so a leaked
//! channel or a stream left running shows up as a missing release event.

mod common;

use battery_core::mocks::{Event, FixedStrap};
use battery_core::{InitError, Property};
use battery_traits::SourceError;
use common::{NAME, Rig};
use rstest::rstest;

fn acquire_both() -> Vec<Event> {
    vec![
        Event::AcquireChannel("voltage".into()),
        Event::AcquireChannel("current".into()),
    ]
}

fn release_both() -> Vec<Event> {
    vec![
        Event::ReleaseChannel("current".into()),
        Event::ReleaseChannel("voltage".into()),
    ]
}

#[test]
fn full_cycle_releases_in_reverse_order() {
    let rig = Rig::new();
    let mut dev = rig.init(false);
    assert!(dev.is_sampling());
    assert!(rig.source.is_running());

    let mut expected = acquire_both();
    expected.extend([
        Event::RegisterStream,
        Event::RegisterSupply(NAME.into()),
        Event::StartStream,
    ]);
    assert_eq!(rig.log.events(), expected);

    dev.teardown();
    expected.extend([
        Event::StopStream,
        Event::UnregisterSupply,
        Event::ReleaseStream,
    ]);
    expected.extend(release_both());
    assert_eq!(rig.log.events(), expected);
    assert!(dev.is_torn_down());
    assert!(rig.registry.local().is_empty());
}

#[test]
fn teardown_is_idempotent_and_drop_does_not_repeat_it() {
    let rig = Rig::new();
    let mut dev = rig.init(true);
    dev.teardown();
    let after_first = rig.log.events();
    dev.teardown();
    drop(dev);
    assert_eq!(rig.log.events(), after_first);
}

#[test]
fn dropping_the_device_tears_it_down() {
    let rig = Rig::new();
    let dev = rig.init(false);
    drop(dev);
    let events = rig.log.events();
    assert_eq!(events.last(), Some(&Event::ReleaseChannel("voltage".into())));
    assert!(events.contains(&Event::StopStream));
    assert!(!rig.source.has_callback());
}

#[test]
fn strap_is_read_exactly_once() {
    let rig = Rig::new();
    let mut strap = FixedStrap::new(true);
    let dev = rig.init_with(&mut strap).unwrap();
    let _ = dev.telemetry().get(Property::Technology);
    let _ = dev.telemetry().get(Property::VoltageMaxDesign);
    assert_eq!(strap.reads(), 1);
}

#[test]
fn stop_sampling_twice_is_harmless_and_final() {
    let rig = Rig::new();
    let dev = rig.init(false);
    assert!(rig.source.emit([0x0010, 0x0020]));
    let before = dev.telemetry().cache().snapshot();

    dev.stop_sampling();
    dev.stop_sampling();
    assert!(!dev.is_sampling());
    assert!(!rig.source.emit([0x0FFF, 0x0FFF]));
    assert_eq!(dev.telemetry().cache().snapshot(), before);

    let stops = rig
        .log
        .events()
        .into_iter()
        .filter(|e| *e == Event::StopStream)
        .count();
    assert_eq!(stops, 1);
}

#[test]
fn stream_is_not_started_before_supply_is_registered() {
    let rig = Rig::new();
    let _dev = rig.init(false);
    let events = rig.log.events();
    let registered = events
        .iter()
        .position(|e| matches!(e, Event::RegisterSupply(_)))
        .unwrap();
    let started = events
        .iter()
        .position(|e| *e == Event::StartStream)
        .unwrap();
    assert!(registered < started);
}

#[derive(Debug, Clone, Copy)]
enum FailAt {
    VoltageChannel,
    CurrentChannel,
    Stream,
    Strap,
    Registry,
    Start,
}

#[rstest]
#[case(FailAt::VoltageChannel, true, vec![])]
#[case(FailAt::CurrentChannel, true, vec![
    Event::AcquireChannel("voltage".into()),
    Event::ReleaseChannel("voltage".into()),
])]
#[case(FailAt::Stream, false, [acquire_both(), release_both()].concat())]
#[case(FailAt::Strap, true, [
    acquire_both(),
    vec![Event::RegisterStream, Event::ReleaseStream],
    release_both(),
].concat())]
#[case(FailAt::Registry, false, [
    acquire_both(),
    vec![Event::RegisterStream, Event::ReleaseStream],
    release_both(),
].concat())]
#[case(FailAt::Start, false, [
    acquire_both(),
    vec![
        Event::RegisterStream,
        Event::RegisterSupply(NAME.into()),
        Event::UnregisterSupply,
        Event::ReleaseStream,
    ],
    release_both(),
].concat())]
fn partial_bring_up_unwinds_everything(
    #[case] at: FailAt,
    #[case] retry_later: bool,
    #[case] expected: Vec<Event>,
) {
    let rig = Rig::new();
    let defer = || SourceError::RetryLater("provider not ready".into());
    let hard = || SourceError::Hard("broken".into());
    let mut strap = FixedStrap::new(false);
    match at {
        FailAt::VoltageChannel => {
            rig.source.fail_acquire("voltage", defer());
        }
        FailAt::CurrentChannel => {
            rig.source.fail_acquire("current", defer());
        }
        FailAt::Stream => {
            rig.source.fail_register(hard());
        }
        FailAt::Strap => strap = FixedStrap::failing(defer()),
        FailAt::Registry => rig
            .registry
            .fail_with(InitError::Fatal("framework refused".into())),
        FailAt::Start => {
            rig.source.fail_start(hard());
        }
    }

    let err = rig.init_with(&mut strap).err().expect("bring-up must fail");
    assert_eq!(err.is_retry_later(), retry_later, "{at:?}: {err}");
    assert_eq!(rig.log.events(), expected, "{at:?}");
    assert!(!rig.source.is_running());
    assert!(!rig.source.has_callback());
    assert!(rig.registry.local().is_empty());
}

#[test]
fn deferred_channel_error_names_the_channel() {
    let rig = Rig::new();
    rig.source
        .fail_acquire("current", SourceError::RetryLater("iio not probed".into()));
    let err = rig.init_with(&mut FixedStrap::new(false)).err().unwrap();
    assert!(matches!(&err, InitError::RetryLater(msg) if msg.contains("current")));
}

#[test]
fn second_device_with_same_name_is_rejected_and_cleaned_up() {
    let rig = Rig::new();
    let _first = rig.init(false);

    let other = Rig::new();
    let second = battery_core::BatteryDevice::init(
        other.source.clone(),
        &mut FixedStrap::new(false),
        rig.registry.clone(),
        &battery_core::DeviceCfg::default(),
    );
    assert!(matches!(second, Err(InitError::Fatal(_))));
    assert!(!other.source.is_running());
    assert_eq!(rig.registry.local().len(), 1);
}
