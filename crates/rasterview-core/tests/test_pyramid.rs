mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use kurbo::Affine;

use rasterview_core::error::RasterViewError;
use rasterview_core::pyramid::{
    derivation::downsample, Downsample, FnDerivation, LevelDerivation, LevelState, NoData,
    PyramidModel, PyramidSource, Rescale, Stretch,
};

use common::{flat_raster, ramp_raster, CountingDerivation};

fn wait_for(flag: &AtomicBool) {
    while !flag.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }
}

// ---------------------------------------------------------------------------
// Model geometry
// ---------------------------------------------------------------------------

#[test]
fn test_power_of_two_level_sizes() {
    let model = PyramidModel::new(256, 128, 5, Affine::IDENTITY).unwrap();
    let sizes: Vec<_> = (0..5).map(|l| model.level_size(l).unwrap()).collect();
    assert_eq!(
        sizes,
        vec![(256, 128), (128, 64), (64, 32), (32, 16), (16, 8)]
    );
    assert_eq!(model.scales(), &[1.0, 2.0, 4.0, 8.0, 16.0]);
}

#[test]
fn test_model_rejects_invalid_geometry() {
    assert!(matches!(
        PyramidModel::new(0, 10, 2, Affine::IDENTITY),
        Err(RasterViewError::InvalidDimensions { width: 0, height: 10 })
    ));
    assert!(matches!(
        PyramidModel::new(10, 10, 0, Affine::IDENTITY),
        Err(RasterViewError::InvalidPyramid(_))
    ));
    assert!(matches!(
        PyramidModel::with_scales(10, 10, vec![1.0, 4.0, 2.0], Affine::IDENTITY),
        Err(RasterViewError::InvalidPyramid(_))
    ));
    assert!(matches!(
        PyramidModel::with_scales(10, 10, vec![2.0, 4.0], Affine::IDENTITY),
        Err(RasterViewError::InvalidPyramid(_))
    ));
    assert!(matches!(
        PyramidModel::new(10, 10, 2, Affine::scale(0.0)),
        Err(RasterViewError::InvalidPyramid(_))
    ));
}

#[test]
fn test_level_for_zoom_picks_coarsest_sufficient_level() {
    let model = PyramidModel::new(1024, 1024, 4, Affine::IDENTITY).unwrap();
    assert_eq!(model.level_for_zoom(4.0), 0);
    assert_eq!(model.level_for_zoom(1.0), 0);
    assert_eq!(model.level_for_zoom(0.5), 1);
    assert_eq!(model.level_for_zoom(0.3), 1);
    assert_eq!(model.level_for_zoom(0.01), 3);

    let scaled = PyramidModel::new(1024, 1024, 4, Affine::scale(2.0)).unwrap();
    assert_eq!(scaled.level_for_zoom(0.25), 1);
}

#[test]
fn test_model_bounds_follow_image_transform() {
    let model = PyramidModel::new(100, 50, 2, Affine::translate((10.0, 20.0)) * Affine::scale(2.0))
        .unwrap();
    let bounds = model.model_bounds();
    assert_eq!((bounds.x0, bounds.y0, bounds.x1, bounds.y1), (10.0, 20.0, 210.0, 120.0));
}

// ---------------------------------------------------------------------------
// Level caching
// ---------------------------------------------------------------------------

#[test]
fn test_level_images_have_model_sizes_and_are_cached() {
    let source = PyramidSource::new(ramp_raster(256, 128), 5, Arc::new(Downsample::default())).unwrap();

    for level in 0..5 {
        assert_eq!(source.level_state(level).unwrap(), LevelState::Empty);
        let image = source.level_image(level).unwrap();
        let (w, h) = source.model().level_size(level).unwrap();
        assert_eq!((image.width(), image.height()), (w, h));
        assert_eq!(source.level_state(level).unwrap(), LevelState::Ready);

        let again = source.level_image(level).unwrap();
        assert!(Arc::ptr_eq(&image, &again));
    }
}

#[test]
fn test_downsampled_level_averages_blocks() {
    let source = PyramidSource::new(ramp_raster(256, 128), 2, Arc::new(Downsample::default())).unwrap();
    let level1 = source.level_image(1).unwrap();
    // (0 + 1 + 256 + 257) / 4
    assert_eq!(level1.sample(0, 0), Some(128.5));
}

#[test]
fn test_rescale_derivation_applies_linear_map() {
    let source = PyramidSource::new(ramp_raster(8, 8), 2, Arc::new(Rescale::new(2.5, 0.0))).unwrap();
    let level0 = source.level_image(0).unwrap();
    assert_eq!(level0.sample(3, 0), Some(7.5));
    assert_eq!(level0.sample(0, 1), Some(20.0));
}

#[test]
fn test_custom_scales_drive_level_sizes() {
    let source = PyramidSource::new(
        ramp_raster(9, 6),
        0,
        Arc::new(Downsample::with_scales(vec![1.0, 3.0])),
    )
    .unwrap();
    assert_eq!(source.model().level_count(), 2);
    let level1 = source.level_image(1).unwrap();
    assert_eq!((level1.width(), level1.height()), (3, 2));
}

#[test]
fn test_out_of_range_level_is_rejected() {
    let source = PyramidSource::new(ramp_raster(16, 16), 3, Arc::new(Downsample::default())).unwrap();
    match source.level_image(5) {
        Err(RasterViewError::LevelOutOfRange { level, level_count }) => {
            assert_eq!(level, 5);
            assert_eq!(level_count, 3);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(source.level_state(3).is_err());
    assert!(!source.cancel_level(7));
}

// ---------------------------------------------------------------------------
// Single flight
// ---------------------------------------------------------------------------

#[test]
fn test_concurrent_requests_share_one_derivation() {
    let counting = CountingDerivation::with_delay(50);
    let derivation: Arc<dyn LevelDerivation> = counting.clone();
    let source = PyramidSource::new(ramp_raster(128, 128), 3, derivation).unwrap();

    let images: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| source.level_image(1).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(counting.calls(), 1);
    for image in &images[1..] {
        assert!(Arc::ptr_eq(&images[0], image));
    }
}

#[test]
fn test_clones_share_the_cache() {
    let counting = CountingDerivation::with_delay(0);
    let derivation: Arc<dyn LevelDerivation> = counting.clone();
    let source = PyramidSource::new(ramp_raster(32, 32), 2, derivation).unwrap();
    let other = source.clone();

    let a = source.level_image(1).unwrap();
    let b = other.level_image(1).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(counting.calls(), 1);
}

#[test]
fn test_request_level_image_delivers_asynchronously() {
    let source = PyramidSource::new(ramp_raster(64, 64), 3, Arc::new(Downsample::default())).unwrap();
    let (tx, rx) = mpsc::channel();
    source.request_level_image(2, move |result| {
        tx.send(result.map(|image| (image.width(), image.height()))).unwrap();
    });
    let size = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
    assert_eq!(size, (16, 16));
    assert!(source.cached_level_image(2).is_some());
}

#[test]
fn test_callbacks_join_a_blocking_derivation() {
    // Two workers only, so parked waiters would starve the leader's row jobs.
    let _ = rayon::ThreadPoolBuilder::new().num_threads(2).build_global();

    let counting = CountingDerivation::with_delay(300);
    let derivation: Arc<dyn LevelDerivation> = counting.clone();
    // Level 1 is 256x256, large enough for the parallel downsampling path.
    let source = PyramidSource::new(ramp_raster(512, 512), 2, derivation).unwrap();
    let (tx, rx) = mpsc::channel();

    let leader = {
        let source = source.clone();
        thread::spawn(move || source.level_image(1))
    };
    while source.level_state(1).unwrap() != LevelState::Computing {
        thread::sleep(Duration::from_millis(1));
    }
    for _ in 0..2 {
        let tx = tx.clone();
        source.request_level_image(1, move |result| tx.send(result).unwrap());
    }

    let image = leader.join().unwrap().unwrap();
    for _ in 0..2 {
        let delivered = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert!(Arc::ptr_eq(&image, &delivered));
    }
    assert_eq!(counting.calls(), 1);
}

#[test]
fn test_concurrent_requests_share_one_async_derivation() {
    let counting = CountingDerivation::with_delay(100);
    let derivation: Arc<dyn LevelDerivation> = counting.clone();
    let source = PyramidSource::new(ramp_raster(64, 64), 2, derivation).unwrap();
    let (tx, rx) = mpsc::channel();

    for _ in 0..3 {
        let tx = tx.clone();
        source.request_level_image(1, move |result| tx.send(result).unwrap());
    }

    let images: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap())
        .collect();
    assert!(Arc::ptr_eq(&images[0], &images[1]));
    assert!(Arc::ptr_eq(&images[0], &images[2]));
    assert_eq!(counting.calls(), 1);
}

#[test]
fn test_request_out_of_range_reports_inline() {
    let source = PyramidSource::new(ramp_raster(8, 8), 1, Arc::new(Downsample::default())).unwrap();
    let (tx, rx) = mpsc::channel();
    source.request_level_image(4, move |result| tx.send(result.is_err()).unwrap());
    assert!(rx.try_recv().unwrap());
}

// ---------------------------------------------------------------------------
// Invalidation
// ---------------------------------------------------------------------------

#[test]
fn test_replace_source_rederives_levels() {
    let counting = CountingDerivation::with_delay(0);
    let derivation: Arc<dyn LevelDerivation> = counting.clone();
    let source = PyramidSource::new(ramp_raster(64, 64), 3, derivation).unwrap();

    let before = source.level_image(1).unwrap();
    source.replace_source(flat_raster(32, 16, 1.0)).unwrap();

    assert_eq!(source.level_state(1).unwrap(), LevelState::Empty);
    assert_eq!(source.model().width(), 32);
    let after = source.level_image(1).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!((after.width(), after.height()), (16, 8));
    assert_eq!(after.sample(0, 0), Some(1.0));
    assert_eq!(counting.calls(), 2);
}

#[test]
fn test_result_from_stale_generation_is_not_cached() {
    let started = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));
    let derivation = {
        let started = Arc::clone(&started);
        let release = Arc::clone(&release);
        FnDerivation::new("slow", move |base, level, model, _cancel| {
            started.store(true, Ordering::SeqCst);
            wait_for(&release);
            downsample(base, level, model, &Default::default())
        })
    };
    let source = PyramidSource::new(ramp_raster(16, 16), 2, Arc::new(derivation)).unwrap();

    thread::scope(|scope| {
        let handle = scope.spawn(|| source.level_image(1));
        wait_for(&started);
        source.invalidate();
        release.store(true, Ordering::SeqCst);
        let image = handle.join().unwrap().unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
    });

    assert_eq!(source.level_state(1).unwrap(), LevelState::Empty);
}

#[test]
fn test_set_empty_yields_no_data_levels() {
    let source = PyramidSource::new(ramp_raster(40, 20), 3, Arc::new(Downsample::default())).unwrap();
    source.level_image(0).unwrap();
    source.set_empty();

    assert!(source.is_empty());
    let level2 = source.level_image(2).unwrap();
    assert_eq!((level2.width(), level2.height()), (10, 5));
    assert!(level2.is_no_data());
}

#[test]
fn test_empty_sentinel_source() {
    let model = PyramidModel::new(30, 10, 2, Affine::IDENTITY).unwrap();
    let source = PyramidSource::empty(model);
    assert!(source.is_empty());
    let level1 = source.level_image(1).unwrap();
    assert_eq!((level1.width(), level1.height()), (15, 5));
    assert!(level1.is_no_data());
}

#[test]
fn test_no_data_derivation() {
    let source = PyramidSource::new(ramp_raster(8, 8), 2, Arc::new(NoData)).unwrap();
    assert!(source.level_image(0).unwrap().is_no_data());
}

// ---------------------------------------------------------------------------
// Failure and cancellation
// ---------------------------------------------------------------------------

#[test]
fn test_failed_derivation_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let derivation = {
        let attempts = Arc::clone(&attempts);
        FnDerivation::new("flaky", move |base, level, model, cancel| {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(RasterViewError::Derivation {
                    level,
                    message: "transient".into(),
                });
            }
            downsample(base, level, model, cancel)
        })
    };
    let source = PyramidSource::new(ramp_raster(16, 16), 2, Arc::new(derivation)).unwrap();

    let err = source.level_image(1).unwrap_err();
    assert!(matches!(err, RasterViewError::Derivation { level: 1, .. }));
    assert_eq!(source.level_state(1).unwrap(), LevelState::Failed);
    assert!(source.cached_level_image(1).is_none());

    let image = source.level_image(1).unwrap();
    assert_eq!((image.width(), image.height()), (8, 8));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_invalid_stretch_range_fails() {
    let source = PyramidSource::new(ramp_raster(8, 8), 1, Arc::new(Stretch::new(5.0, 5.0))).unwrap();
    assert!(matches!(
        source.level_image(0),
        Err(RasterViewError::Derivation { level: 0, .. })
    ));
}

#[test]
fn test_panicking_derivation_becomes_error() {
    let derivation = FnDerivation::new("broken", |_, _, _, _| panic!("boom"));
    let source = PyramidSource::new(ramp_raster(8, 8), 1, Arc::new(derivation)).unwrap();
    let err = source.level_image(0).unwrap_err();
    assert!(err.to_string().contains("panicked"));
    assert_eq!(source.level_state(0).unwrap(), LevelState::Failed);
}

#[test]
fn test_cancelled_level_returns_to_empty() {
    let started = Arc::new(AtomicBool::new(false));
    let derivation = {
        let started = Arc::clone(&started);
        FnDerivation::new("cancellable", move |_, level, _, cancel| {
            started.store(true, Ordering::SeqCst);
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            Err(RasterViewError::Cancelled { level })
        })
    };
    let source = PyramidSource::new(ramp_raster(16, 16), 2, Arc::new(derivation)).unwrap();

    thread::scope(|scope| {
        let handle = scope.spawn(|| source.level_image(1));
        wait_for(&started);
        assert_eq!(source.level_state(1).unwrap(), LevelState::Computing);
        assert!(source.cancel_level(1));
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(RasterViewError::Cancelled { level: 1 })));
    });

    assert_eq!(source.level_state(1).unwrap(), LevelState::Empty);
}
