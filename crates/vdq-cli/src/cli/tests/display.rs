use crate::cli::display::*;

#[test]
fn bytes_pick_unit() {
    assert_eq!(human_bytes(512), "512 B");
    assert_eq!(human_bytes(1536), "1.5 KiB");
    assert_eq!(human_bytes(10 * 1024 * 1024), "10.0 MiB");
    assert_eq!(human_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
}

#[test]
fn durations() {
    assert_eq!(human_duration(59), "0:59");
    assert_eq!(human_duration(212), "3:32");
    assert_eq!(human_duration(3723), "1:02:03");
}

#[test]
fn speeds() {
    assert_eq!(human_speed(512.0), "512 KiB/s");
    assert_eq!(human_speed(2048.0), "2.00 MiB/s");
}

#[test]
fn progress_with_and_without_total() {
    assert_eq!(progress_line(50, 1024, Some(2048)), "1.0 KiB / 2.0 KiB (50%)");
    assert_eq!(progress_line(0, 100, None), "100 B (0%)");
    assert_eq!(or_dash::<u32>(None), "-");
}

#[test]
fn short_id_is_prefix() {
    let id = uuid::Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
    assert_eq!(short_id(&id), "67e55044");
}
