/// Length of a record id: 12 random bytes rendered as lowercase hex.
pub const OBJECT_ID_LEN: usize = 24;

// generate a new record id
pub fn new_object_id() -> String {
    let bytes: [u8; OBJECT_ID_LEN / 2] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// whether the value has the shape of a record id rather than a slug
pub fn is_object_id(value: &str) -> bool {
    value.len() == OBJECT_ID_LEN && value.chars().all(|c| c.is_ascii_hexdigit())
}
