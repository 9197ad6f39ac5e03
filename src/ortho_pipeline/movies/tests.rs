use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::RgbImage;
use ndarray::{Array5, s};

use crate::ortho_pipeline::{
    colormap::{Palette, build_depth_colormap},
    common::error::{ErrorKind, PipelineError, Result},
    config::PipelineConfig,
    metadata::{ChannelDescriptor, DisplayWindow},
    movies::{MovieMaker, ProjectionDims, select_composite_pair},
    projection::{ProjectionEngine, SliceAxis},
    store::{InMemoryStore, paths},
    video::{FrameSink, VideoEncoder},
};

#[derive(Debug, Default)]
struct RecordedMovie {
    path: PathBuf,
    width: u32,
    height: u32,
    frame_rate: u32,
    frames: Vec<RgbImage>,
    finalized: bool,
}

#[derive(Clone, Default)]
struct MockEncoder {
    movies: Arc<Mutex<Vec<RecordedMovie>>>,
    fail_on_frame: Option<usize>,
}

struct MockSink {
    movies: Arc<Mutex<Vec<RecordedMovie>>>,
    slot: usize,
    fail_on_frame: Option<usize>,
}

impl VideoEncoder for MockEncoder {
    type Sink = MockSink;

    fn extension(&self) -> &str {
        "avi"
    }

    fn open(&self, path: &Path, width: u32, height: u32, frame_rate: u32) -> Result<MockSink> {
        std::fs::write(path, b"")?;
        let mut movies = self.movies.lock().unwrap();
        movies.push(RecordedMovie {
            path: path.to_path_buf(),
            width,
            height,
            frame_rate,
            ..RecordedMovie::default()
        });
        Ok(MockSink {
            movies: self.movies.clone(),
            slot: movies.len() - 1,
            fail_on_frame: self.fail_on_frame,
        })
    }
}

impl FrameSink for MockSink {
    fn append_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let mut movies = self.movies.lock().unwrap();
        let movie = &mut movies[self.slot];
        if self.fail_on_frame == Some(movie.frames.len()) {
            return Err(PipelineError::video_sink(&movie.path, "mock sink full"));
        }
        movie.frames.push(frame.clone());
        Ok(())
    }

    fn finalize(self) -> Result<()> {
        self.movies.lock().unwrap()[self.slot].finalized = true;
        Ok(())
    }
}

const Z: usize = 4;
const Y: usize = 8;
const X: usize = 8;
const GAP: usize = 20;

fn quiet_config() -> PipelineConfig {
    PipelineConfig::builder().show_progress(false).build()
}

fn channel(name: &str, index: usize, max: f64) -> ChannelDescriptor {
    ChannelDescriptor::new(name, index, DisplayWindow::new(0.0, max).unwrap())
}

/// Projected store over a (2, C, 4, 8, 8) volume filled by `fill`.
fn projected_store(channels: usize, sliced: bool, fill: impl FnOnce(&mut Array5<u16>)) -> InMemoryStore {
    let mut volume = Array5::<u16>::zeros((2, channels, Z, Y, X));
    fill(&mut volume);
    let store = InMemoryStore::new();
    store
        .insert_array(&paths::resolution_level(0), volume.into_dyn())
        .unwrap();

    let config = PipelineConfig::builder().show_progress(false).slice_depth(3).build();
    let engine = ProjectionEngine::new(&store, config);
    engine.compute_dense_projections().unwrap();
    if sliced {
        engine.compute_sliced_projections().unwrap();
    }
    store
}

fn single_voxel_store() -> InMemoryStore {
    projected_store(1, false, |volume| volume[[0, 0, 2, 3, 5]] = 200)
}

fn pixel(frame: &RgbImage, row: usize, col: usize) -> [u8; 3] {
    frame.get_pixel(col as u32, row as u32).0
}

#[test]
fn test_depth_movie_single_voxel() {
    let store = single_voxel_store();
    let out = tempfile::tempdir().unwrap();
    let encoder = MockEncoder::default();
    let maker = MovieMaker::with_custom(&store, encoder.clone(), quiet_config(), out.path());

    let path = maker.render_depth(&channel("cells", 0, 200.0)).unwrap();
    assert_eq!(path, out.path().join("cells_zdepth_orthomax.avi"));

    let movies = encoder.movies.lock().unwrap();
    let movie = &movies[0];
    assert!(movie.finalized);
    assert_eq!(movie.frames.len(), 2);
    assert_eq!((movie.width, movie.height), ((X + Z + GAP) as u32, (Y + Z + GAP) as u32));
    assert_eq!(movie.frame_rate, 10);

    let colormap = build_depth_colormap(Z, &Palette::by_name("gist_rainbow_r").unwrap());
    let frame = &movie.frames[0];
    let xy_top = Z + GAP;
    assert_eq!(pixel(frame, xy_top + 3, 5), colormap.color(2));
    for y in 0..Y {
        for x in 0..X {
            if (y, x) != (3, 5) {
                assert_eq!(pixel(frame, xy_top + y, x), [0, 0, 0], "({y}, {x})");
            }
        }
    }
    // no signal at t = 1
    assert_eq!(pixel(&movie.frames[1], xy_top + 3, 5), [0, 0, 0]);
}

#[test]
fn test_orthomax_movie_layout_and_gap() {
    let store = single_voxel_store();
    let out = tempfile::tempdir().unwrap();
    let encoder = MockEncoder::default();
    let maker = MovieMaker::with_custom(&store, encoder.clone(), quiet_config(), out.path());
    maker.render_orthomax(&channel("cells", 0, 200.0)).unwrap();

    let movies = encoder.movies.lock().unwrap();
    let frame = &movies[0].frames[0];
    let viridis_top = Palette::by_name("viridis").unwrap().color(255);

    // XY, flipped XZ (z = 2 lands on row Z - 1 - 2) and transposed YZ
    assert_eq!(pixel(frame, Z + GAP + 3, 5), viridis_top);
    assert_eq!(pixel(frame, Z - 1 - 2, 5), viridis_top);
    assert_eq!(pixel(frame, Z + GAP + 3, X + GAP + 2), viridis_top);
    // background is masked and the gap stays black
    assert_eq!(pixel(frame, Z + GAP, 0), [0, 0, 0]);
    for row in Z..Z + GAP {
        for col in 0..frame.width() as usize {
            assert_eq!(pixel(frame, row, col), [0, 0, 0]);
        }
    }
}

#[test]
fn test_repeated_movies_get_unique_names() {
    let store = single_voxel_store();
    let out = tempfile::tempdir().unwrap();
    let maker = MovieMaker::with_custom(&store, MockEncoder::default(), quiet_config(), out.path());
    let cells = channel("cells", 0, 200.0);

    assert_eq!(maker.render_orthomax(&cells).unwrap(), out.path().join("cells_orthomax.avi"));
    assert_eq!(maker.render_orthomax(&cells).unwrap(), out.path().join("cells_orthomax_1.avi"));
    assert_eq!(maker.render_orthomax(&cells).unwrap(), out.path().join("cells_orthomax_2.avi"));
}

#[test]
fn test_composite_masks_on_primary() {
    let store = projected_store(2, false, |volume| {
        // rocks everywhere, cells at a single voxel
        volume.slice_mut(s![.., 1, .., .., ..]).fill(50);
        volume[[0, 0, 1, 2, 2]] = 100;
    });
    let out = tempfile::tempdir().unwrap();
    let encoder = MockEncoder::default();
    let maker = MovieMaker::with_custom(&store, encoder.clone(), quiet_config(), out.path());
    let channels = [
        channel("cells", 0, 100.0),
        channel("rocks", 1, 100.0).with_invert_display(true),
    ];

    let path = maker.render_composite(&channels).unwrap();
    assert_eq!(path, out.path().join("comp_orthomax.avi"));

    let movies = encoder.movies.lock().unwrap();
    let frame = &movies[0].frames[0];
    // 50 of 100 -> 127, inverted -> 128
    assert_eq!(pixel(frame, Z + GAP + 2, 2), [255, 128, 255]);
    assert_eq!(pixel(frame, Z + GAP + 5, 6), [0, 0, 0]);
    assert!(movies[0].frames[1].pixels().all(|p| p.0 == [0, 0, 0]));
}

#[test]
fn test_sliced_movies_dimensions() {
    let store = projected_store(1, true, |volume| volume.fill(10));
    let out = tempfile::tempdir().unwrap();
    let encoder = MockEncoder::default();
    let maker = MovieMaker::with_custom(&store, encoder.clone(), quiet_config(), out.path());
    let cells = channel("cells", 0, 20.0);

    let x_path = maker.render_sliced(&cells, SliceAxis::X).unwrap();
    let y_path = maker.render_sliced(&cells, SliceAxis::Y).unwrap();
    assert_eq!(x_path, out.path().join("cells_X_sliced_orthomax.avi"));
    assert_eq!(y_path, out.path().join("cells_Y_sliced_orthomax.avi"));

    let movies = encoder.movies.lock().unwrap();
    // ceil(8 / 3) = 3 bands of Z rows with two gaps between them
    let height = (Z * 3 + GAP * 2) as u32;
    assert_eq!((movies[0].width, movies[0].height), (Y as u32, height));
    assert_eq!((movies[1].width, movies[1].height), (X as u32, height));
    assert_eq!(movies[0].frames.len(), 2);

    let frame = &movies[0].frames[0];
    let band = Palette::by_name("viridis").unwrap().color(127);
    assert_eq!(pixel(frame, 0, 0), band);
    assert_eq!(pixel(frame, Z, 0), [0, 0, 0]);
    assert_eq!(pixel(frame, Z + GAP, 0), band);
}

#[test]
fn test_sink_failure_is_surfaced() {
    let store = single_voxel_store();
    let out = tempfile::tempdir().unwrap();
    let encoder = MockEncoder {
        fail_on_frame: Some(1),
        ..MockEncoder::default()
    };
    let maker = MovieMaker::with_custom(&store, encoder.clone(), quiet_config(), out.path());

    let err = maker.render_orthomax(&channel("cells", 0, 200.0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("t=1"), "{err}");
    assert!(!encoder.movies.lock().unwrap()[0].finalized);
}

#[test]
fn test_make_all_movies_without_sliced_projections() {
    let store = projected_store(2, false, |volume| volume.fill(1));
    let out = tempfile::tempdir().unwrap();
    let maker = MovieMaker::with_custom(&store, MockEncoder::default(), quiet_config(), out.path());
    let channels = [
        channel("cells", 0, 10.0),
        channel("rocks", 1, 10.0).with_invert_display(true),
    ];

    let movies = maker.make_all_movies(&channels).unwrap();
    let names: Vec<_> = movies
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "cells_orthomax.avi",
            "cells_zdepth_orthomax.avi",
            "rocks_orthomax.avi",
            "rocks_zdepth_orthomax.avi",
            "comp_orthomax.avi",
        ]
    );
}

#[test]
fn test_make_all_movies_with_sliced_projections() {
    let store = projected_store(1, true, |volume| volume.fill(1));
    let out = tempfile::tempdir().unwrap();
    let maker = MovieMaker::with_custom(&store, MockEncoder::default(), quiet_config(), out.path());

    let movies = maker.make_all_movies(&[channel("cells", 0, 10.0)]).unwrap();
    assert_eq!(movies.len(), 4);
    assert!(movies[1].ends_with("cells_X_sliced_orthomax.avi"));
    assert!(movies[2].ends_with("cells_Y_sliced_orthomax.avi"));
}

#[test]
fn test_missing_projections_is_configuration_error() {
    let store = InMemoryStore::new();
    let out = tempfile::tempdir().unwrap();
    let maker = MovieMaker::with_custom(&store, MockEncoder::default(), quiet_config(), out.path());
    let err = maker.render_orthomax(&channel("cells", 0, 1.0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_channel_index_out_of_range() {
    let store = single_voxel_store();
    let out = tempfile::tempdir().unwrap();
    let maker = MovieMaker::with_custom(&store, MockEncoder::default(), quiet_config(), out.path());
    let err = maker.render_depth(&channel("ghost", 3, 1.0)).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}

#[test]
fn test_projection_dims_cross_check() {
    let dims = ProjectionDims::from_shapes(&[2, 1, 2, 8, 6], &[2, 1, 4, 8], &[2, 1, 4, 6]).unwrap();
    assert_eq!((dims.t, dims.c, dims.z, dims.y, dims.x), (2, 1, 4, 8, 6));

    let disagree = ProjectionDims::from_shapes(&[2, 1, 2, 8, 6], &[2, 1, 4, 8], &[3, 1, 4, 6]);
    assert!(matches!(disagree, Err(PipelineError::Shape(_))));
    let z_mismatch = ProjectionDims::from_shapes(&[2, 1, 2, 8, 6], &[2, 1, 4, 8], &[2, 1, 5, 6]);
    assert!(matches!(z_mismatch, Err(PipelineError::Shape(_))));
}

#[test]
fn test_composite_pair_selection() {
    let cells = channel("cells", 0, 1.0);
    let rocks = channel("rocks", 1, 1.0).with_invert_display(true);

    let pair = [rocks.clone(), cells.clone()];
    let (primary, secondary) = select_composite_pair(&pair).unwrap();
    assert_eq!((primary.name.as_str(), secondary.name.as_str()), ("cells", "rocks"));

    assert!(select_composite_pair(std::slice::from_ref(&cells)).is_err());
    let both_plain = [cells.clone(), channel("other", 1, 1.0)];
    assert_eq!(
        select_composite_pair(&both_plain).unwrap_err().kind(),
        ErrorKind::Configuration
    );
}
