use cropcut_edit_model::crop::CropRect;
use cropcut_edit_model::metadata::SourceMetadata;
use cropcut_edit_model::session::{EditSession, ExportFormat, ExportQuality};
use cropcut_edit_model::timeline::TrimInterval;
use cropcut_export::compiler::{ATEMPO_MAX, ATEMPO_MIN};
use cropcut_export::{compile, tempo_stages, StageKind};
use proptest::prelude::*;

fn format() -> impl Strategy<Value = ExportFormat> {
    prop_oneof![Just(ExportFormat::Mp4), Just(ExportFormat::Gif)]
}

fn quality() -> impl Strategy<Value = ExportQuality> {
    prop_oneof![
        Just(ExportQuality::Low),
        Just(ExportQuality::Medium),
        Just(ExportQuality::High),
    ]
}

prop_compose! {
    fn session_and_source()(
        width in 64u32..3840,
        height in 64u32..2160,
        duration in 0.5f64..600.0,
        has_audio in any::<bool>(),
        crop_fraction in (0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0),
        trim_fraction in (0.0f64..1.0, 0.0f64..1.0),
        speed in 0.25f64..4.0,
        format in format(),
        quality in quality(),
    ) -> (EditSession, SourceMetadata) {
        let metadata = SourceMetadata::new(duration, width, height).with_audio(has_audio);
        let mut session = EditSession::for_source(&metadata);

        let (fx, fy, fw, fh) = crop_fraction;
        let frame = metadata.frame();
        let w = frame.min_width() + fw * (frame.w() - frame.min_width());
        let h = frame.min_height() + fh * (frame.h() - frame.min_height());
        session.crop = CropRect::new(fx * (frame.w() - w), fy * (frame.h() - h), w, h);

        let (fs, fe) = trim_fraction;
        session.trim = TrimInterval::new(fs * duration, fe * duration).fitted_to(duration);
        session.set_speed(speed);
        session.format = format;
        session.quality = quality;
        (session, metadata)
    }
}

proptest! {
    #[test]
    fn tempo_stages_multiply_to_speed(speed in 0.25f64..=4.0) {
        let stages = tempo_stages(speed);
        for stage in &stages {
            prop_assert!((ATEMPO_MIN..=ATEMPO_MAX).contains(stage), "{stage} out of range");
        }
        if !stages.is_empty() {
            let product: f64 = stages.iter().product();
            prop_assert!((product - speed).abs() < 1e-9 * speed, "{stages:?} != {speed}");
        }
    }

    #[test]
    fn extreme_tempo_stages_stay_in_range(speed in 0.01f64..100.0) {
        let stages = tempo_stages(speed);
        prop_assert!(stages.iter().all(|s| (ATEMPO_MIN..=ATEMPO_MAX).contains(s)));
        let product: f64 = stages.iter().product();
        prop_assert!((product - speed).abs() < 1e-9 * speed.max(1.0) || stages.is_empty());
    }

    #[test]
    fn compiled_pipelines_are_deterministic_and_ordered((session, metadata) in session_and_source()) {
        let first = compile(&session, &metadata);
        let second = compile(&session, &metadata);
        prop_assert_eq!(&first, &second);

        let plan = first.map_err(|e| TestCaseError::fail(e.to_string()))?;
        let kinds = plan.video_filters.kinds();
        prop_assert!(kinds.windows(2).all(|w| w[0] < w[1]), "stages out of order: {kinds:?}");
        prop_assert_eq!(kinds.first(), Some(&StageKind::Trim));

        if let Some(crop) = plan.crop {
            prop_assert!(crop.x + crop.width <= metadata.width);
            prop_assert!(crop.y + crop.height <= metadata.height);
            if session.format == ExportFormat::Mp4 {
                prop_assert_eq!(crop.width % 2, 0);
                prop_assert_eq!(crop.height % 2, 0);
            }
        }

        match session.format {
            ExportFormat::Gif => {
                prop_assert!(plan.audio_filters.is_none());
                prop_assert!(plan.palette.is_some());
                prop_assert_eq!(plan.invocations("in".as_ref(), "out.gif".as_ref()).len(), 2);
            }
            ExportFormat::Mp4 => {
                prop_assert_eq!(plan.audio_filters.is_some(), metadata.has_audio);
                prop_assert!(plan.palette.is_none());
                prop_assert_eq!(plan.invocations("in".as_ref(), "out.mp4".as_ref()).len(), 1);
            }
        }

        let expected = session.trim.length() / session.speed;
        let actual = plan.output_duration_secs.unwrap_or(f64::NAN);
        prop_assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }
}
