use braillecue::{ConversionOptions, Progress, ProgressPhase, SubtitleConverter, VideoOptions};
use image::{Rgb, RgbImage};
use std::cell::RefCell;
use std::fs;

#[test]
fn image_directory_to_document() {
    let root = tempfile::tempdir().unwrap();
    let clip = root.path().join("clip");
    let out = root.path().join("out");
    fs::create_dir_all(&clip).unwrap();
    for i in 0..4u8 {
        RgbImage::from_pixel(160, 90, Rgb([i * 68, 0, 0]))
            .save(clip.join(format!("frame_{:05}.png", i + 1)))
            .unwrap();
    }
    let srt = root.path().join("clip.srt");
    fs::write(&srt, "1\n00:00:00,000 --> 00:00:00,250\nHello & bye\n").unwrap();

    let phases = RefCell::new(Vec::new());
    let converter = SubtitleConverter::new();
    let video_opts = VideoOptions { start_ms: 0, fps: Some(10.0), subtitles: Some(srt) };
    let summary = converter
        .convert_images(&clip, &out, &video_opts, &ConversionOptions::default().with_rows(8), |p: Progress| {
            phases.borrow_mut().push(p.phase)
        })
        .unwrap();

    assert_eq!(summary.output_path, out.join("clip.srv3"));
    assert_eq!(summary.cue_count, 4);
    assert_eq!(summary.palette_size, 4);
    assert_eq!(summary.meta_cue_count, 3);
    assert!(!summary.truncated);
    assert_eq!(phases.borrow().last(), Some(&ProgressPhase::Complete));

    let doc = fs::read_to_string(&summary.output_path).unwrap();
    assert!(doc.contains("<p t=0 d=100 wp=0 ws=0 p=0>"));
    assert!(doc.contains("<p t=300 d=100 wp=0 ws=0 p=3>"));
    assert!(doc.contains("<p t=200 d=50 wp=1 ws=1>Hello &amp; bye</p>"));
    assert_eq!(doc.matches("<pen ").count(), 4);
    assert!(doc.len() > summary.output_bytes);
}

#[test]
fn single_image_runs_five_seconds() {
    let root = tempfile::tempdir().unwrap();
    let still = root.path().join("still.png");
    RgbImage::from_pixel(640, 480, Rgb([255, 255, 255])).save(&still).unwrap();

    let summary = SubtitleConverter::new()
        .convert_images(&still, root.path(), &VideoOptions::default(), &ConversionOptions::default().with_rows(12), |_| {})
        .unwrap();
    assert_eq!(summary.output_path.file_name().unwrap(), "still.narrow.srv3");
    assert_eq!(summary.plan.output_fps, 0.2);

    let doc = fs::read_to_string(&summary.output_path).unwrap();
    assert!(doc.contains("<p t=0 d=5000 wp=0 ws=0 p=0>"));
}

#[test]
fn non_image_input_rejected() {
    let root = tempfile::tempdir().unwrap();
    let notes = root.path().join("notes.txt");
    fs::write(&notes, "hello").unwrap();
    let result = SubtitleConverter::new().convert_images(&notes, root.path(), &VideoOptions::default(), &ConversionOptions::default(), |_| {});
    assert!(result.is_err());
}
