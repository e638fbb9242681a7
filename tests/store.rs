use std::thread;
use std::time::Duration;

use kadlookup::{content_key, Kademlia, Testnet};

#[test]
fn republish_reaches_peers_back_online() {
    let testnet = Testnet::new(20);
    let data = &b"republished"[..];
    let key = content_key(data);

    let closest = testnet.closest(&key, 3);
    for contact in &closest {
        testnet.set_online(contact.address, false);
    }

    let mut builder = Kademlia::builder();
    builder
        .node_round_timeout(Duration::from_millis(20))
        .republish_interval(Duration::from_millis(200));

    let kademlia = testnet.client_with(&builder, 4).unwrap();

    assert_eq!(kademlia.store(data), key);
    thread::sleep(Duration::from_millis(50));
    assert!(testnet.holders(&key).is_empty());

    for contact in &closest {
        testnet.set_online(contact.address, true);
    }
    thread::sleep(Duration::from_millis(400));

    let mut holders = testnet.holders(&key);
    holders.sort_by_key(|c| c.id.distance(&key));
    assert_eq!(holders, closest);

    assert!(kademlia.stop_republishing(&key));
    assert!(kademlia.republishing().is_empty());
}

#[test]
fn shutdown_stops_every_republish_task() {
    let testnet = Testnet::new(10);

    let mut builder = Kademlia::builder();
    builder.node_round_timeout(Duration::from_millis(20));

    let kademlia = testnet.client_with(&builder, 3).unwrap();

    let a = kademlia.store(&b"a"[..]);
    let b = kademlia.store(&b"b"[..]);

    let mut republishing = kademlia.republishing();
    republishing.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(republishing, expected);

    kademlia.shutdown();
    assert!(kademlia.republishing().is_empty());
}
