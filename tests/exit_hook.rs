// Process-exit cleanup of shared diagnostic handles.
//
// `close_all` releases every handle in the process, so these tests live in
// their own binary and run one at a time.
use dmxp_logrelay::Core::{close_all, install_exit_hook};
use dmxp_logrelay::SharedLog::{SharedLogBuilder, SharedRingLog};
use dmxp_logrelay::SharedLogError;
use serial_test::serial;

fn open(namespace: &str, process: &str) -> SharedRingLog {
    SharedLogBuilder::new()
        .with_namespace(format!("dmxp_exit_{}_{}.", std::process::id(), namespace))
        .with_process_name(process)
        .open()
        .unwrap()
}

#[test]
#[serial]
fn test_open_installs_exit_hook() {
    let _log = open("hook", "a");
    // The handler slot is already taken by the hook.
    assert!(ctrlc::set_handler(|| {}).is_err());
    assert!(install_exit_hook());
}

#[test]
#[serial]
fn test_close_all_releases_every_handle() {
    let a = open("close_all", "a");
    let b = open("close_all", "b");
    assert_eq!(a.instance_count().unwrap(), 2);
    a.write("before exit").unwrap();

    close_all();
    assert!(!a.is_open());
    assert!(!b.is_open());
    assert!(matches!(a.instance_count(), Err(SharedLogError::Closed)));

    // Both counts were released, so the segment starts over.
    let c = open("close_all", "c");
    assert_eq!(c.instance_count().unwrap(), 1);
    assert!(c.read_new().unwrap().is_empty());

    // A second pass closes the newer handle; the old ones drop quietly.
    close_all();
    drop(a);
    drop(b);
    assert!(!c.is_open());
}
