use lumbung::{
    storage::table::{Table, MAX_TUPLE_SIZE},
    types::{TupleLocation, PAGE_SIZE},
    DatabaseError,
};
use tempfile::tempfile;

fn new_table() -> Table {
    Table::new(tempfile().unwrap(), tempfile().unwrap())
}

fn collect(table: &mut Table) -> (Vec<Vec<u8>>, Vec<TupleLocation>) {
    let mut tuples = Vec::new();
    let mut locations = Vec::new();
    table
        .scan(|tuple, loc| {
            tuples.push(tuple);
            locations.push(loc);
            Ok(true)
        })
        .unwrap();
    (tuples, locations)
}

#[test]
fn create_retrieve_delete() {
    let inputs: Vec<&[u8]> = vec![b"here's some data", b"have a nice day", b"good bye"];
    let mut table = new_table();

    for input in &inputs {
        table.add(input).unwrap();
    }

    let (tuples, locations) = collect(&mut table);
    assert_eq!(tuples, inputs.iter().map(|t| t.to_vec()).collect::<Vec<_>>());
    assert_eq!(locations[0], TupleLocation { page: 0, slot: 0 });
    assert_eq!(locations[1], TupleLocation { page: 0, slot: 1 });

    // delete the middle one and it disappears from the next scan
    table.delete(locations[1]).unwrap();
    let (tuples, _) = collect(&mut table);
    assert_eq!(tuples, vec![inputs[0].to_vec(), inputs[2].to_vec()]);
}

#[test]
fn bulk_insert_spills_across_pages_in_order() {
    // 40 bytes per batch, 250 batches = 10_000 bytes, more than one page
    let batch: Vec<&[u8]> = vec![b"here's some data", b"have a nice day", b"good bye!"];
    let mut inputs: Vec<Vec<u8>> = Vec::new();
    for _ in 0..250 {
        for item in &batch {
            inputs.push(item.to_vec());
        }
    }

    let data = tempfile().unwrap();
    let data_handle = data.try_clone().unwrap();
    let mut table = Table::new(data, tempfile().unwrap());
    for input in &inputs {
        table.add(input).unwrap();
    }

    let (tuples, locations) = collect(&mut table);
    assert_eq!(tuples, inputs);

    // the data file stays a whole number of pages and spans at least two
    let size = data_handle.metadata().unwrap().len();
    assert_eq!(size % PAGE_SIZE as u64, 0);
    assert!(size >= 2 * PAGE_SIZE as u64);
    assert!(locations.iter().any(|loc| loc.page > 0));
}

#[test]
fn deleted_tuples_make_room_for_new_ones() {
    let mut table = new_table();
    for i in 0..100 {
        table.add(format!("row number {:04}", i).as_bytes()).unwrap();
    }
    let (_, locations) = collect(&mut table);
    for loc in &locations[10..20] {
        table.delete(*loc).unwrap();
    }

    table.add(b"replacement row").unwrap();
    let (tuples, _) = collect(&mut table);
    assert_eq!(tuples.len(), 91);
    // the replacement reuses a freed slot on the first page
    assert!(tuples.iter().any(|t| t == b"replacement row"));
}

#[test]
fn scan_stops_when_the_iterator_says_so() {
    let mut table = new_table();
    for i in 0..10 {
        table.add(format!("tuple {}", i).as_bytes()).unwrap();
    }

    let mut seen = 0;
    table
        .scan(|_, _| {
            seen += 1;
            Ok(seen < 3)
        })
        .unwrap();
    assert_eq!(seen, 3);
}

#[test]
fn scan_aborts_on_iterator_error() {
    let mut table = new_table();
    table.add(b"one").unwrap();
    table.add(b"two").unwrap();

    let result = table.scan(|_, _| {
        Err(DatabaseError::SerializationError {
            details: "boom".to_string(),
        })
    });
    assert!(matches!(
        result,
        Err(DatabaseError::SerializationError { .. })
    ));
}

#[test]
fn oversized_tuples_are_rejected_up_front() {
    let mut table = new_table();
    let err = table.add(&vec![0u8; MAX_TUPLE_SIZE + 1]).unwrap_err();
    assert!(matches!(err, DatabaseError::TupleTooLarge { .. }));

    // the largest admissible tuple still goes through
    table.add(&vec![0u8; MAX_TUPLE_SIZE]).unwrap();
    let (tuples, _) = collect(&mut table);
    assert_eq!(tuples.len(), 1);
}

#[test]
fn delete_out_of_range_page_is_rejected() {
    let mut table = new_table();
    table.add(b"something").unwrap();

    let err = table
        .delete(TupleLocation { page: 99, slot: 0 })
        .unwrap_err();
    assert!(matches!(err, DatabaseError::PageOutOfRange { .. }));

    let err = table
        .delete(TupleLocation { page: 0, slot: 42 })
        .unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidSlotIndex { .. }));
}

#[test]
fn closed_tables_reject_everything() {
    let mut table = new_table();
    table.add(b"before close").unwrap();
    table.close().unwrap();

    assert!(matches!(
        table.add(b"after close"),
        Err(DatabaseError::TableClosed)
    ));
    assert!(matches!(
        table.scan(|_, _| Ok(true)),
        Err(DatabaseError::TableClosed)
    ));
    assert!(matches!(table.flush(), Err(DatabaseError::TableClosed)));
    // a double close is an error as well
    assert!(matches!(table.close(), Err(DatabaseError::TableClosed)));
}
