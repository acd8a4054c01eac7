use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string id.
pub fn stable_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}

/// Stable identifier of one chunk of a source document.
///
/// The chunking parameters and the chunk text are part of the key: re-chunking
/// with different sizes never collides with old records, and an edited passage
/// at the same offset gets a new id instead of reusing the stale one.
pub fn chunk_uuid(source: &str, offset: usize, chunk_size: usize, overlap: usize, text: &str) -> Uuid {
    stable_uuid(&format!("chunk|{source}|{offset}|{chunk_size}|{overlap}|{text}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_uuid() {
        assert_eq!(stable_uuid("plot.txt#0"), stable_uuid("plot.txt#0"));
        assert_ne!(stable_uuid("plot.txt#0"), stable_uuid("plot.txt#1"));
    }

    #[test]
    fn chunk_uuid_depends_on_parameters() {
        let a = chunk_uuid("plot.txt", 400, 500, 100, "Bella boards the ship.");
        assert_eq!(a, chunk_uuid("plot.txt", 400, 500, 100, "Bella boards the ship."));
        assert_ne!(a, chunk_uuid("plot.txt", 400, 400, 100, "Bella boards the ship."));
        assert_ne!(a, chunk_uuid("other.txt", 400, 500, 100, "Bella boards the ship."));
    }

    #[test]
    fn chunk_uuid_changes_with_text() {
        assert_ne!(
            chunk_uuid("plot.txt", 3, 4, 1, "DEFG"),
            chunk_uuid("plot.txt", 3, 4, 1, "DXYZ")
        );
    }
}
