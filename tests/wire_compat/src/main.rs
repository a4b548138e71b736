fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use facewire_protocol::{Frame, FrameError, Operation, decode_frame, encode_frame};
    use serde::Deserialize;

    /// A well-formed frame and the fields it must decode to.
    #[derive(Debug, Deserialize)]
    struct FrameFixture {
        name: String,
        operation: String,
        primary_hex: String,
        #[serde(default)]
        secondary_hex: Option<String>,
        /// Expected text for error-message frames.
        #[serde(default)]
        text: Option<String>,
        frame_hex: String,
    }

    /// Bytes that must be refused, and the kind of refusal.
    #[derive(Debug, Deserialize)]
    struct MalformedFixture {
        name: String,
        frame_hex: String,
        error: String,
    }

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn unhex(name: &str, field: &str, value: &str) -> Vec<u8> {
        hex::decode(value).unwrap_or_else(|e| panic!("{name}: bad hex in {field}: {e}"))
    }

    fn error_kind(err: &FrameError) -> &'static str {
        match err {
            FrameError::BadPrefix { .. } => "bad_prefix",
            FrameError::UnknownOperation(_) => "unknown_operation",
            FrameError::Truncated { .. } => "truncated",
            FrameError::TrailingBytes(_) => "trailing_bytes",
            FrameError::PayloadTooLarge(_) => "payload_too_large",
            FrameError::MissingSecondary => "missing_secondary",
            FrameError::UnexpectedSecondary => "unexpected_secondary",
        }
    }

    #[test]
    fn fixture_frames_encode_byte_exact() {
        let fixtures: Vec<FrameFixture> = load_fixture("frames.json");
        assert!(!fixtures.is_empty());

        for f in &fixtures {
            let primary = unhex(&f.name, "primary_hex", &f.primary_hex);
            let secondary = f
                .secondary_hex
                .as_deref()
                .map(|s| unhex(&f.name, "secondary_hex", s));
            let expected = unhex(&f.name, "frame_hex", &f.frame_hex);

            let operation = match f.operation.as_str() {
                "detect" => Operation::Detect,
                "replace" => Operation::Replace,
                "output" => Operation::Output,
                "error_message" => Operation::ErrorMessage,
                other => panic!("{}: unknown operation {other}", f.name),
            };
            assert_eq!(operation.as_str(), f.operation, "{}: operation name", f.name);

            let encoded = encode_frame(operation, &primary, secondary.as_deref())
                .unwrap_or_else(|e| panic!("{}: encode failed: {e}", f.name));
            assert_eq!(
                hex::encode(&encoded),
                f.frame_hex,
                "{}: encoded bytes differ",
                f.name
            );

            let decoded = decode_frame(&expected)
                .unwrap_or_else(|e| panic!("{}: decode failed: {e}", f.name));
            assert_eq!(
                decoded,
                Frame {
                    operation,
                    primary,
                    secondary,
                },
                "{}: decoded frame differs",
                f.name
            );

            if let Some(text) = &f.text {
                assert_eq!(&decoded.text(), text, "{}: error text", f.name);
            }
        }
    }

    #[test]
    fn fixture_malformed_frames_are_rejected() {
        let fixtures: Vec<MalformedFixture> = load_fixture("malformed.json");
        assert!(!fixtures.is_empty());

        for f in &fixtures {
            let bytes = unhex(&f.name, "frame_hex", &f.frame_hex);
            match decode_frame(&bytes) {
                Ok(frame) => panic!("{}: decoded unexpectedly: {frame:?}", f.name),
                Err(e) => assert_eq!(error_kind(&e), f.error, "{}: {e}", f.name),
            }
        }
    }

    #[test]
    fn prefix_is_little_endian_on_the_wire() {
        let frame = Frame::detect(Vec::new()).encode().unwrap();
        assert_eq!(&frame[..4], &[0x31, 0x72, 0x10, 0x23]);
    }
}
