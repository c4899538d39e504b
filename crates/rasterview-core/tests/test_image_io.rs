use ndarray::array;

use rasterview_core::io::image_io::{load_raster, save_png};
use rasterview_core::raster::Raster;

#[test]
fn test_png_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("levels.png");
    let raster = Raster::new(array![[0.0f32, 1.0, 0.5], [f32::NAN, 2.0, -1.0]]);

    save_png(&raster, &path).unwrap();
    let loaded = load_raster(&path).unwrap();

    assert_eq!((loaded.width(), loaded.height()), (3, 2));
    assert_eq!(loaded.sample(0, 0), Some(0.0));
    assert_eq!(loaded.sample(1, 0), Some(1.0));
    // 0.5 * 255 truncates to 127
    let mid = loaded.sample(2, 0).unwrap();
    assert!((mid - 127.0 / 255.0).abs() < 1e-4);
    // no data is written as black, out-of-range values are clamped
    assert_eq!(loaded.sample(0, 1), Some(0.0));
    assert_eq!(loaded.sample(1, 1), Some(1.0));
    assert_eq!(loaded.sample(2, 1), Some(0.0));
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_raster(&dir.path().join("missing.png")).is_err());
}
