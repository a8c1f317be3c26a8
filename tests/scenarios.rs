//! End-to-end scenarios exercising a running `ObjectGraphTable` through its
//! client-facing `TableUpdater`, covering link mirroring, atomic multi-item
//! updates, filtered cascade removal, and test-and-set attributes.

mod support;

use objgraph::persistence::PersistenceScheduler;
use objgraph::{
    AttrValue, AttributeMap, EngineConfig, Flags, Link, MergeBehavior, ObjectGraphTable, ObjectId, TableUpdater, UpdateItem,
};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Option<Duration> = Some(Duration::from_secs(2));

fn start_table() -> (ObjectGraphTable, TableUpdater) {
    support::init_tracing();
    let table = ObjectGraphTable::start(EngineConfig::default(), PersistenceScheduler::new());
    let updater = table.updater();
    (table, updater)
}

fn run(updater: &TableUpdater, items: Vec<UpdateItem>) -> objgraph::ResultCode {
    let action = updater.update_many(items, Default::default());
    action.wait(WAIT);
    action.result_code()
}

/// Scenario 1: `AddLink` installs a mirror and bumps `addedItems`.
#[test]
fn add_link_installs_mirror_and_publishes_both_ends() {
    let (table, updater) = start_table();

    let lp1 = ObjectId::new("SubstLoc", "LP1");
    let s001 = ObjectId::new("Subst", "S001");
    updater
        .add_object_and_wait(lp1.clone(), AttributeMap::new(), Flags::PINNED, WAIT)
        .unwrap();
    updater.add_object_and_wait(s001.clone(), AttributeMap::new(), Flags::empty(), WAIT).unwrap();

    let code = run(&updater, vec![UpdateItem::add_link(Link::new(lp1.clone(), s001.clone(), "Contains"))]);
    assert!(code.is_success(), "{code}");

    let lp1_obj = updater.get_publisher(&lp1).unwrap().current().unwrap();
    assert_eq!(lp1_obj.links_out.len(), 1);
    assert_eq!(lp1_obj.links_out[0].key, "Contains");
    assert_eq!(lp1_obj.links_out[0].to_id, s001);

    let s001_obj = updater.get_publisher(&s001).unwrap().current().unwrap();
    assert_eq!(s001_obj.links_in.len(), 1);
    assert_eq!(s001_obj.links_in[0].from_id, lp1);

    let summary = updater.seq_nums_publisher().current().unwrap();
    assert_eq!(summary.added_items, 2);

    table.shutdown();
}

/// Scenario 2: one `Update` batch combining `SetAttributes` and
/// `AddLink(autoUnlinkFromPrior=true)` is visible atomically.
#[test]
fn set_attributes_and_auto_unlink_apply_atomically() {
    let (table, updater) = start_table();

    let lp1 = ObjectId::new("SubstLoc", "LP1");
    let lp2 = ObjectId::new("SubstLoc", "LP2");
    let s001 = ObjectId::new("Subst", "S001");
    for id in [&lp1, &lp2, &s001] {
        updater.add_object_and_wait(id.clone(), AttributeMap::new(), Flags::empty(), WAIT).unwrap();
    }
    run(&updater, vec![UpdateItem::add_link(Link::new(lp1.clone(), s001.clone(), "Contains"))]);

    let mut attrs = AttributeMap::new();
    attrs.insert("Slot".to_string(), AttrValue::Int(3));
    let code = run(
        &updater,
        vec![
            UpdateItem::set_attributes(s001.clone(), attrs, MergeBehavior::AddAndUpdate),
            UpdateItem::AddLink {
                link: Link::new(lp2.clone(), s001.clone(), "Contains"),
                auto_unlink_from_prior: true,
                if_needed: false,
            },
        ],
    );
    assert!(code.is_success(), "{code}");

    let lp1_obj = updater.get_publisher(&lp1).unwrap().current().unwrap();
    assert!(lp1_obj.links_out.is_empty());
    let lp2_obj = updater.get_publisher(&lp2).unwrap().current().unwrap();
    assert_eq!(lp2_obj.links_out.len(), 1);
    let s001_obj = updater.get_publisher(&s001).unwrap().current().unwrap();
    assert_eq!(s001_obj.attributes.get("Slot"), Some(&AttrValue::Int(3)));

    table.shutdown();
}

/// Scenario 3: filtered `RemoveObject` cascades onto an un-pinned neighbor
/// reached through a matching link, and both final publications carry
/// `IsFinal`.
#[test]
fn filtered_remove_cascades_to_unpinned_neighbor() {
    let (table, updater) = start_table();

    let lp1 = ObjectId::new("SubstLoc", "LP1");
    let s001 = ObjectId::new("Subst", "S001");
    updater.add_object_and_wait(lp1.clone(), AttributeMap::new(), Flags::empty(), WAIT).unwrap();
    updater.add_object_and_wait(s001.clone(), AttributeMap::new(), Flags::empty(), WAIT).unwrap();
    run(&updater, vec![UpdateItem::add_link(Link::new(lp1.clone(), s001.clone(), "Contains"))]);

    let lp1_publisher = updater.get_publisher(&lp1).unwrap();
    let s001_publisher = updater.get_publisher(&s001).unwrap();

    let filter: objgraph::LinkedRemovalFilter = Arc::new(|link: &Link| link.key == "Contains");
    let code = run(
        &updater,
        vec![UpdateItem::RemoveObject {
            id: lp1.clone(),
            linked_removal_filter: Some(filter),
        }],
    );
    assert!(code.is_success(), "{code}");

    assert!(updater.get_publisher(&lp1).is_none());
    assert!(updater.get_publisher(&s001).is_none());
    assert!(lp1_publisher.current().unwrap().is_final());
    assert!(s001_publisher.current().unwrap().is_final());
    assert!(updater.get_objects(None, None).is_empty());

    table.shutdown();
}

/// Scenario 4: `TestAndSetAttributes` succeeds once, then fails against a
/// stale expectation without mutating.
#[test]
fn test_and_set_attributes_matches_then_mismatches() {
    let (table, updater) = start_table();

    let accum = ObjectId::new("Accum", "A1");
    let mut initial = AttributeMap::new();
    initial.insert("Value".to_string(), AttrValue::Int(10));
    updater.add_object_and_wait(accum.clone(), initial, Flags::empty(), WAIT).unwrap();

    let mut test_attrs = AttributeMap::new();
    test_attrs.insert("Value".to_string(), AttrValue::Int(10));
    let mut set_attrs = AttributeMap::new();
    set_attrs.insert("Value".to_string(), AttrValue::Int(11));
    let code = run(
        &updater,
        vec![UpdateItem::TestAndSetAttributes {
            id: accum.clone(),
            test_attributes: test_attrs,
            attributes: set_attrs,
            merge_behavior: MergeBehavior::AddAndUpdate,
            fail_if_not_met: true,
            test_conditions_met: None,
        }],
    );
    assert!(code.is_success(), "{code}");
    let obj = updater.get_publisher(&accum).unwrap().current().unwrap();
    assert_eq!(obj.attributes.get("Value"), Some(&AttrValue::Int(11)));

    // Expectation is now stale (current Value is 11, not 10).
    let mut stale_test = AttributeMap::new();
    stale_test.insert("Value".to_string(), AttrValue::Int(10));
    let mut new_set = AttributeMap::new();
    new_set.insert("Value".to_string(), AttrValue::Int(99));
    let code = run(
        &updater,
        vec![UpdateItem::TestAndSetAttributes {
            id: accum.clone(),
            test_attributes: stale_test,
            attributes: new_set,
            merge_behavior: MergeBehavior::AddAndUpdate,
            fail_if_not_met: true,
            test_conditions_met: None,
        }],
    );
    assert!(!code.is_success());
    let obj = updater.get_publisher(&accum).unwrap().current().unwrap();
    assert_eq!(obj.attributes.get("Value"), Some(&AttrValue::Int(11)));

    table.shutdown();
}
