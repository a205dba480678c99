//! Single counter scenarios against the in-process store.

use redis_counter::{CounterError, Float64Counter, Int64Counter, MemoryStore};

#[test]
fn test_missing_key_reads_zero_and_stays_unknown() {
    let store = MemoryStore::new();
    let mut bob = Int64Counter::key(&store, "Bob").unwrap();

    assert_eq!(bob.get().unwrap(), 0);
    assert_eq!(bob.last_value(), None);
    assert_eq!(bob.to_string(), "Bob = NaN");
    assert!(!bob.exists().unwrap());
}

#[test]
fn test_add_to_existing_text_value() {
    let store = MemoryStore::new();
    store.set_string("Bob", "123");
    let mut bob = Int64Counter::key(&store, "Bob").unwrap();

    assert_eq!(bob.get().unwrap(), 123);
    assert_eq!(bob.add(555).unwrap(), 678);
    assert_eq!(bob.to_string(), "Bob = 678");
    assert_eq!(store.get_string("Bob").as_deref(), Some("678"));
}

#[test]
fn test_int_key_lifecycle() {
    let store = MemoryStore::new();
    let mut c = Int64Counter::key(&store, "visits").unwrap();

    c.set(10).unwrap();
    assert_eq!(c.last_value(), Some(10));
    assert_eq!(c.increment().unwrap(), 11);
    assert_eq!(c.decrement().unwrap(), 10);
    assert_eq!(c.sub(15).unwrap(), -5);
    assert!(c.exists().unwrap());
    // exists forgets the last value
    assert_eq!(c.last_value(), None);

    c.delete().unwrap();
    assert!(!c.exists().unwrap());
    assert_eq!(c.get().unwrap(), 0);
}

#[test]
fn test_float_field_formatting() {
    let store = MemoryStore::new();
    let mut c = Float64Counter::field(&store, "Key", "Bob").unwrap();

    assert_eq!(c.to_string(), "Key[Bob] = NaN");
    c.set(1.5).unwrap();
    assert_eq!(c.to_string(), "Key[Bob] = 1.500000");
    assert_eq!(c.add(0.25).unwrap(), 1.75);
    assert_eq!(c.sub(0.75).unwrap(), 1.0);
    assert_eq!(c.increment().unwrap(), 2.0);
    assert_eq!(c.to_string(), "Key[Bob] = 2.000000");
    assert_eq!(store.get_field("Key", "Bob").as_deref(), Some("2"));
}

#[test]
fn test_float_key_reads_integer_text() {
    let store = MemoryStore::new();
    store.set_string("temp", "21");
    let mut c = Float64Counter::key(&store, "temp").unwrap();
    assert_eq!(c.get().unwrap(), 21.0);
    assert_eq!(c.decrement().unwrap(), 20.0);
}

#[test]
fn test_non_numeric_value_resets_last_value() {
    let store = MemoryStore::new();
    store.set_field("Key", "George", "1");
    let mut c = Int64Counter::field(&store, "Key", "George").unwrap();
    assert_eq!(c.get().unwrap(), 1);

    store.set_field("Key", "George", "Gary");
    let err = c.get().unwrap_err();
    assert!(err.is_not_a_number(), "got {:?}", err);
    assert_eq!(c.last_value(), None);
    assert_eq!(c.to_string(), "Key[George] = NaN");

    match c.increment() {
        Err(CounterError::Store(msg)) => assert_eq!(msg, "ERR hash value is not an integer"),
        other => panic!("expected store error, got {:?}", other),
    }
}

#[test]
fn test_sub_of_min_on_field_overflows_before_sending() {
    let store = MemoryStore::new();
    let mut c = Int64Counter::field(&store, "Key", "Bob").unwrap();
    c.set(5).unwrap();
    let before = store.commands_processed();

    assert!(matches!(c.sub(i64::MIN), Err(CounterError::Overflow)));
    assert_eq!(store.commands_processed(), before);
    assert_eq!(c.last_value(), None);
}

#[test]
fn test_construction_errors() {
    let store = MemoryStore::new();
    assert_eq!(Int64Counter::key(&store, "").unwrap_err().to_string(), "Empty redis key");
    assert_eq!(
        Float64Counter::field(&store, "Key", "").unwrap_err().to_string(),
        "Empty redis field"
    );
    assert_eq!(
        Float64Counter::field(&store, "", "Bob").unwrap_err().to_string(),
        "Empty redis key"
    );
}

#[test]
fn test_counters_share_one_store() {
    let store = MemoryStore::new();
    let mut a = Int64Counter::key(store.clone(), "shared").unwrap();
    let mut b = Int64Counter::key(store.clone(), "shared").unwrap();

    a.increment().unwrap();
    assert_eq!(b.increment().unwrap(), 2);
    // a has not observed b's write
    assert_eq!(a.last_value(), Some(1));
    assert_eq!(a.get().unwrap(), 2);
}

