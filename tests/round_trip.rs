use csvnorm::csv_io::{read_csv, write_csv};
use csvnorm::query::ColumnRef;
use csvnorm::sql::{Dialect, parse_sql};
use csvnorm::sqlite::SqliteSession;
use csvnorm::{
    Error, JoinKind, NormaliseOptions, RowTransform, SelectQuery, Session, Value, ValueType,
    denormalise_prepare, empty_deleter, renormalise_prepare, row, type_coercer,
};

const DDL: &str = r#"
CREATE TABLE lookup_nonk_table (
    id INTEGER PRIMARY KEY,
    description VARCHAR NOT NULL
);
CREATE TABLE lookup_table (
    id INTEGER PRIMARY KEY,
    description VARCHAR NOT NULL UNIQUE
);
CREATE TABLE normalised_table (
    id INTEGER PRIMARY KEY,
    username VARCHAR NOT NULL UNIQUE,
    name VARCHAR,
    accounttype_id INTEGER NOT NULL REFERENCES lookup_table (id),
    age INTEGER NOT NULL,
    valid BOOLEAN NOT NULL,
    nonk_id INTEGER REFERENCES lookup_nonk_table (id)
);
"#;

fn seeded() -> SqliteSession {
    let session = SqliteSession::open_in_memory().unwrap();
    session.execute_batch(DDL).unwrap();
    for description in ["admin", "user"] {
        session
            .insert("lookup_table", &row! { "description" => description })
            .unwrap();
    }
    for description in ["one", "two"] {
        session
            .insert("lookup_nonk_table", &row! { "description" => description })
            .unwrap();
    }
    session
}

fn with_accounts(session: &SqliteSession) {
    let rows = [
        row! { "username" => "bob", "name" => "Big Bob", "accounttype_id" => 1i64, "age" => 31i64, "valid" => true, "nonk_id" => 1i64 },
        row! { "username" => "joe", "name" => "Regular Joe", "accounttype_id" => 2i64, "age" => 32i64, "valid" => false, "nonk_id" => 2i64 },
        row! { "username" => "noname", "name" => "", "accounttype_id" => 2i64, "age" => 33i64, "valid" => false, "nonk_id" => 1i64 },
    ];
    for r in &rows {
        session.insert("normalised_table", r).unwrap();
    }
}

fn export_csv(session: &SqliteSession, table: &str) -> String {
    let schema = session.reflect_schema().unwrap();
    let table = schema.require_table(table).unwrap();
    let q = denormalise_prepare(&schema, table, &NormaliseOptions::default()).unwrap();
    let mut buf = Vec::new();
    write_csv(&mut buf, &q.column_names, &q.fetch(session).unwrap()).unwrap();
    String::from_utf8(buf).unwrap()
}

#[test]
fn denormalise_replaces_foreign_keys_with_natural_keys() {
    let session = seeded();
    with_accounts(&session);
    let schema = session.reflect_schema().unwrap();
    let table = schema.require_table("normalised_table").unwrap();

    let q = denormalise_prepare(&schema, table, &NormaliseOptions::default()).unwrap();
    let rows = q.fetch_rows(&session).unwrap();
    assert_eq!(
        rows,
        vec![
            row! { "username" => "bob", "name" => "Big Bob", "age" => 31i64, "valid" => true, "nonk_id" => 1i64, "accounttype" => "admin" },
            row! { "username" => "joe", "name" => "Regular Joe", "age" => 32i64, "valid" => false, "nonk_id" => 2i64, "accounttype" => "user" },
            row! { "username" => "noname", "name" => "", "age" => 33i64, "valid" => false, "nonk_id" => 1i64, "accounttype" => "user" },
        ]
    );
}

#[test]
fn denormalise_table_without_natural_key_keeps_id() {
    let session = seeded();
    let schema = session.reflect_schema().unwrap();
    let table = schema.require_table("lookup_nonk_table").unwrap();

    let q = denormalise_prepare(&schema, table, &NormaliseOptions::default()).unwrap();
    assert_eq!(q.column_names, vec!["id", "description"]);
    assert_eq!(
        q.fetch_rows(&session).unwrap(),
        vec![
            row! { "id" => 1i64, "description" => "one" },
            row! { "id" => 2i64, "description" => "two" },
        ]
    );
}

#[test]
fn renormalise_swaps_natural_keys_for_ids() {
    let session = seeded();
    let schema = session.reflect_schema().unwrap();
    let table = schema.require_table("normalised_table").unwrap();
    let maker = renormalise_prepare(&session, &schema, table, &NormaliseOptions::default()).unwrap();

    assert_eq!(
        maker
            .transform(row! { "username" => "bob", "name" => "Big Bob", "accounttype" => "admin", "age" => "31", "valid" => "True" })
            .unwrap(),
        row! { "username" => "bob", "name" => "Big Bob", "accounttype_id" => 1i64, "age" => "31", "valid" => "True" }
    );
    assert_eq!(
        maker
            .transform(row! { "username" => "joe", "name" => "Regular Joe", "accounttype" => "user", "age" => "32", "valid" => "False" })
            .unwrap(),
        row! { "username" => "joe", "name" => "Regular Joe", "accounttype_id" => 2i64, "age" => "32", "valid" => "False" }
    );
    assert!(matches!(
        maker.transform(row! { "username" => "x", "accounttype" => "superuser" }),
        Err(Error::LookupMiss { ref value, .. }) if value == "superuser"
    ));
}

#[test]
fn csv_round_trip_restores_the_table() {
    let session = seeded();
    with_accounts(&session);
    let before = export_csv(&session, "normalised_table");
    assert_eq!(
        before,
        "username,name,age,valid,nonk_id,accounttype\n\
         bob,Big Bob,31,True,1,admin\n\
         joe,Regular Joe,32,False,2,user\n\
         noname,,33,False,1,user\n"
    );

    session.execute_batch("DELETE FROM normalised_table").unwrap();

    let schema = session.reflect_schema().unwrap();
    let table = schema.require_table("normalised_table").unwrap();
    let pipeline = renormalise_prepare(&session, &schema, table, &NormaliseOptions::default())
        .unwrap()
        .then(empty_deleter(table))
        .then(type_coercer(table));

    let tx = session.transaction().unwrap();
    for r in read_csv(before.as_bytes()).unwrap() {
        let r = pipeline.transform(r).unwrap();
        session.insert("normalised_table", &r).unwrap();
    }
    tx.commit().unwrap();

    assert_eq!(export_csv(&session, "normalised_table"), before);

    // The empty name came back as NULL rather than an empty string.
    let q = denormalise_prepare(&schema, table, &NormaliseOptions::default()).unwrap();
    let rows = q.fetch_rows(&session).unwrap();
    assert_eq!(rows[2]["name"], Value::Null);
}

#[test]
fn outer_join_keeps_dangling_rows() {
    let session = seeded();
    with_accounts(&session);
    session
        .insert(
            "normalised_table",
            &row! { "username" => "ghost", "accounttype_id" => 99i64, "age" => 1i64, "valid" => true },
        )
        .unwrap();
    let schema = session.reflect_schema().unwrap();
    let table = schema.require_table("normalised_table").unwrap();

    let inner = denormalise_prepare(&schema, table, &NormaliseOptions::default()).unwrap();
    assert_eq!(inner.fetch(&session).unwrap().len(), 3);

    let options = NormaliseOptions::default().with_join(JoinKind::LeftOuter);
    let outer = denormalise_prepare(&schema, table, &options).unwrap();
    let rows = outer.fetch_rows(&session).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3]["accounttype"], Value::Null);
    assert_eq!(rows[3]["nonk_id"], Value::Null);
}

#[test]
fn parsed_and_reflected_schemas_agree() {
    let session = seeded();
    let reflected = session.reflect_schema().unwrap();
    let parsed = parse_sql(DDL, Dialect::Generic).unwrap();

    for name in ["lookup_nonk_table", "lookup_table", "normalised_table"] {
        let options = NormaliseOptions::default();
        let a = denormalise_prepare(&reflected, reflected.require_table(name).unwrap(), &options)
            .unwrap();
        let b = denormalise_prepare(&parsed, parsed.require_table(name).unwrap(), &options).unwrap();
        assert_eq!(a.column_names, b.column_names, "{name}");
        assert_eq!(a.query.to_sql(), b.query.to_sql(), "{name}");
    }
}

const KIND_DDL: &str = r#"
CREATE TABLE kind (
    id INTEGER PRIMARY KEY,
    label TEXT UNIQUE
);
CREATE TABLE item (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    kind_id INTEGER REFERENCES kind (id)
);
"#;

fn kinds(labels: &[&str]) -> SqliteSession {
    let session = SqliteSession::open_in_memory().unwrap();
    session.execute_batch(KIND_DDL).unwrap();
    for label in labels {
        session.insert("kind", &row! { "label" => *label }).unwrap();
    }
    session
}

fn reimport(session: &SqliteSession, csv: &str, options: &NormaliseOptions) {
    session.execute_batch("DELETE FROM item").unwrap();
    let schema = session.reflect_schema().unwrap();
    let table = schema.require_table("item").unwrap();
    let pipeline = renormalise_prepare(session, &schema, table, options)
        .unwrap()
        .then(empty_deleter(table))
        .then(type_coercer(table));
    let tx = session.transaction().unwrap();
    for r in read_csv(csv.as_bytes()).unwrap() {
        session.insert("item", &pipeline.transform(r).unwrap()).unwrap();
    }
    tx.commit().unwrap();
}

fn kind_ids(session: &SqliteSession) -> Vec<Vec<Value>> {
    let q = SelectQuery::from_table("item")
        .select(ColumnRef::new("item", "name"), ValueType::Text)
        .select(ColumnRef::new("item", "kind_id"), ValueType::Integer)
        .order_by(ColumnRef::new("item", "id"));
    session.fetch(&q).unwrap()
}

#[test]
fn empty_natural_key_survives_round_trip() {
    let session = kinds(&["", "big"]);
    session.insert("item", &row! { "name" => "a", "kind_id" => 1i64 }).unwrap();
    session.insert("item", &row! { "name" => "b", "kind_id" => 2i64 }).unwrap();

    let csv = export_csv(&session, "item");
    assert_eq!(csv, "name,kind\na,\nb,big\n");

    reimport(&session, &csv, &NormaliseOptions::default());
    assert_eq!(
        kind_ids(&session),
        vec![
            vec![Value::from("a"), Value::Integer(1)],
            vec![Value::from("b"), Value::Integer(2)],
        ]
    );
}

#[test]
fn outer_join_null_foreign_key_reimports_as_null() {
    let session = kinds(&["big", "small"]);
    session.insert("item", &row! { "name" => "a", "kind_id" => 1i64 }).unwrap();
    session.insert("item", &row! { "name" => "b" }).unwrap();

    let options = NormaliseOptions::default().with_join(JoinKind::LeftOuter);
    let schema = session.reflect_schema().unwrap();
    let table = schema.require_table("item").unwrap();
    let q = denormalise_prepare(&schema, table, &options).unwrap();
    let mut buf = Vec::new();
    write_csv(&mut buf, &q.column_names, &q.fetch(&session).unwrap()).unwrap();
    let csv = String::from_utf8(buf).unwrap();
    assert_eq!(csv, "name,kind\na,big\nb,\n");

    reimport(&session, &csv, &options);
    assert_eq!(
        kind_ids(&session),
        vec![
            vec![Value::from("a"), Value::Integer(1)],
            vec![Value::from("b"), Value::Null],
        ]
    );
}
