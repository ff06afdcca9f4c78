use batch_watermark::{
    blending, output_name, place, Anchor, Color, CompositeOptions, Compositor, Error,
    ImageWatermark, NamedImage, ProcessedResult, SourceFile, TextWatermark, WatermarkSpec,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

fn solid(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(px)))
}

fn png_source(name: &str, img: &DynamicImage) -> SourceFile {
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).unwrap();
    SourceFile {
        name: name.to_string(),
        bytes: bytes.into_inner(),
    }
}

fn decode_png(result: &ProcessedResult) -> RgbaImage {
    image::load_from_memory_with_format(&result.png, ImageFormat::Png)
        .unwrap()
        .to_rgba8()
}

fn image_options(mark: Option<&DynamicImage>, scale: f32, opacity: f32) -> CompositeOptions<'_> {
    CompositeOptions {
        anchor: Anchor::TopLeft,
        watermark: WatermarkSpec::Image(ImageWatermark {
            image: mark,
            scale,
            opacity,
        }),
    }
}

#[test]
fn engine_initializes_successfully() {
    assert!(Compositor::new().is_ok());
}

#[test]
fn absent_watermark_image_reencodes_base_unchanged() {
    let engine = Compositor::new().unwrap();
    let base = DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 48, |x, y| {
        Rgba([u8::try_from(x * 3).unwrap(), u8::try_from(y * 5).unwrap(), 77, 255])
    }));

    let result = engine
        .composite("photo.jpg", &base, &image_options(None, 0.2, 0.8))
        .unwrap();
    assert_eq!(result.name, "photo_processed.png");
    assert_eq!(result.png, blending::encode_png(&base.to_rgba8()).unwrap());
}

#[test]
fn empty_text_is_treated_as_no_watermark() {
    let engine = Compositor::new().unwrap();
    let base = solid(40, 40, [10, 20, 30, 255]);
    let options = CompositeOptions {
        anchor: Anchor::Center,
        watermark: WatermarkSpec::Text(TextWatermark {
            text: String::new(),
            font_size: 24.0,
            color: Color::BLACK,
            bold: true,
            italic: true,
            opacity: 1.0,
        }),
    };
    let result = engine.composite("x.png", &base, &options).unwrap();
    assert_eq!(decode_png(&result), base.to_rgba8());
}

#[test]
fn opacity_does_not_leak_between_calls() {
    let engine = Compositor::new().unwrap();
    let base = solid(100, 100, [0, 0, 0, 255]);
    let mark = solid(10, 10, [255, 255, 255, 255]);

    let fresh = engine.render(&base, &image_options(Some(&mark), 0.5, 1.0));
    let _faint = engine.render(&base, &image_options(Some(&mark), 0.5, 0.1));
    let again = engine.render(&base, &image_options(Some(&mark), 0.5, 1.0));

    assert_eq!(fresh, again);
    assert_eq!(*again.get_pixel(30, 30), Rgba([255, 255, 255, 255]));
}

#[test]
fn opacity_scales_watermark_alpha() {
    let engine = Compositor::new().unwrap();
    let base = solid(100, 100, [0, 0, 0, 255]);
    // half-transparent watermark pixels at 50% opacity: 25% effective
    let mark = solid(10, 10, [255, 255, 255, 128]);

    let out = engine.render(&base, &image_options(Some(&mark), 0.5, 0.5));
    let value = out.get_pixel(40, 40)[0];
    assert!((63..=65).contains(&value), "got {value}");
    assert_eq!(out.get_pixel(40, 40)[3], 255);
}

#[test]
fn aspect_ratio_is_preserved_across_scales() {
    let engine = Compositor::new().unwrap();
    let base = solid(400, 400, [0, 0, 0, 255]);
    let mark = solid(40, 10, [255, 255, 255, 255]);

    for scale in [0.1_f32, 0.25, 0.5] {
        let out = engine.render(&base, &image_options(Some(&mark), scale, 1.0));
        let white: Vec<(u32, u32)> = out
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == 255)
            .map(|(x, y, _)| (x, y))
            .collect();
        let max_x = white.iter().map(|p| p.0).max().unwrap();
        let max_y = white.iter().map(|p| p.1).max().unwrap();
        let w = f64::from(max_x - 20 + 1);
        let h = f64::from(max_y - 20 + 1);
        assert!((h / w - 0.25).abs() < 0.02, "scale {scale}: {w}x{h}");
        assert!((w - 400.0 * f64::from(scale)).abs() <= 1.0);
    }
}

#[test]
fn oversized_watermark_is_clipped_not_rejected() {
    let engine = Compositor::new().unwrap();
    let base = solid(50, 50, [0, 0, 0, 255]);
    let mark = solid(10, 10, [200, 0, 0, 255]);
    let options = CompositeOptions {
        anchor: Anchor::Center,
        watermark: WatermarkSpec::Image(ImageWatermark {
            image: Some(&mark),
            scale: 5.0,
            opacity: 1.0,
        }),
    };
    // 250 x 250 at (-100, -100): covers the whole base
    let out = engine.render(&base, &options);
    assert_eq!(out.dimensions(), (50, 50));
    assert!(out.pixels().all(|p| *p == Rgba([200, 0, 0, 255])));
}

#[test]
fn tall_watermark_far_larger_than_base_is_clipped() {
    let engine = Compositor::new().unwrap();
    let base = solid(1000, 1000, [0, 0, 0, 255]);
    let mark = solid(1, 1000, [255, 255, 255, 255]);
    let options = CompositeOptions {
        anchor: Anchor::Center,
        watermark: WatermarkSpec::Image(ImageWatermark {
            image: Some(&mark),
            scale: 1.0,
            opacity: 1.0,
        }),
    };
    // 1000 x 1_000_000 draw rectangle, only a base-sized window visible
    let out = engine.render(&base, &options);
    assert_eq!(out.dimensions(), (1000, 1000));
    assert_eq!(*out.get_pixel(500, 500), Rgba([255, 255, 255, 255]));
    assert_eq!(*out.get_pixel(0, 999), Rgba([255, 255, 255, 255]));
}

#[test]
fn text_watermark_bottom_right_scenario() {
    let engine = Compositor::new().unwrap();
    let base = solid(1000, 800, [255, 255, 255, 255]);
    let wm = TextWatermark {
        text: "Sample".into(),
        font_size: 24.0,
        color: Color::parse("#000000").unwrap(),
        bold: false,
        italic: false,
        opacity: 0.8,
    };
    let measured = engine.measure_text(&wm, 24.0);
    let (x, y) = place(Anchor::BottomRight, 1000.0, 800.0, measured, 24.0);
    assert!((x - (1000.0 - measured - 20.0)).abs() < 1e-3);
    assert!((y - 756.0).abs() < f32::EPSILON);

    let options = CompositeOptions {
        anchor: Anchor::BottomRight,
        watermark: WatermarkSpec::Text(wm),
    };
    let source = png_source("beach.png", &base);
    let results = engine.composite_all(&[source], &options).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "beach_processed.png");

    let out = decode_png(&results[0]);
    assert_eq!(out.dimensions(), (1000, 800));
    let inked: Vec<(u32, u32, u8)> = out
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] < 255)
        .map(|(px, py, p)| (px, py, p[0]))
        .collect();
    assert!(!inked.is_empty());
    for &(px, py, _) in &inked {
        assert!(f64::from(px) >= f64::from(x) - 2.0 && f64::from(px) <= 982.0);
        // descenders may reach below the font-size box
        assert!(f64::from(py) >= f64::from(y) - 2.0 && py <= 790);
    }
    // 80% black over white never gets darker than 51
    assert!(inked.iter().all(|&(_, _, v)| v >= 50));
}

#[test]
fn batch_preserves_input_order() {
    let engine = Compositor::new().unwrap();
    let sources = vec![
        png_source("a.png", &solid(10, 10, [1, 0, 0, 255])),
        png_source("b.jpeg", &solid(20, 10, [2, 0, 0, 255])),
        png_source("c", &solid(30, 10, [3, 0, 0, 255])),
    ];
    let options = image_options(None, 0.2, 0.8);
    let results = engine.composite_all(&sources, &options).unwrap();

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["a_processed.png", "b_processed.png", "c_processed.png"]);
    let widths: Vec<u32> = results.iter().map(|r| decode_png(r).width()).collect();
    assert_eq!(widths, [10, 20, 30]);
}

#[test]
fn decoded_batch_keeps_order_and_names() {
    let engine = Compositor::new().unwrap();
    let mark = solid(4, 4, [255, 255, 255, 255]);
    let images = vec![
        NamedImage {
            name: "first.jpg".into(),
            image: solid(80, 60, [0, 0, 0, 255]),
        },
        NamedImage {
            name: "second.webp".into(),
            image: solid(60, 30, [0, 0, 0, 255]),
        },
    ];
    let results = engine
        .composite_decoded(&images, &image_options(Some(&mark), 0.25, 1.0))
        .unwrap();

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["first_processed.png", "second_processed.png"]);
    let first = decode_png(&results[0]);
    assert_eq!(first.dimensions(), (80, 60));
    // 20 x 20 mark at the top-left padding offset
    assert_eq!(*first.get_pixel(25, 25), Rgba([255, 255, 255, 255]));
    assert_eq!(*first.get_pixel(45, 25), Rgba([0, 0, 0, 255]));
    assert_eq!(decode_png(&results[1]).dimensions(), (60, 30));
    assert!(engine.composite_decoded(&[], &image_options(None, 0.2, 1.0)).unwrap().is_empty());
}

#[test]
fn batch_fails_fast_on_undecodable_input() {
    let engine = Compositor::new().unwrap();
    let sources = vec![
        png_source("a.png", &solid(10, 10, [1, 0, 0, 255])),
        SourceFile {
            name: "broken.jpg".into(),
            bytes: b"not really a jpeg".to_vec(),
        },
        png_source("c.png", &solid(10, 10, [3, 0, 0, 255])),
    ];
    let options = image_options(None, 0.2, 0.8);

    match engine.composite_all(&sources, &options) {
        Err(Error::Decode { name, .. }) => assert_eq!(name, "broken.jpg"),
        other => panic!("expected decode failure, got {other:?}"),
    }

    let mut lazy = engine.composite_iter(&sources, &options);
    assert_eq!(lazy.next().unwrap().unwrap().name, "a_processed.png");
    assert!(matches!(lazy.next(), Some(Err(Error::Decode { .. }))));
}

#[test]
fn results_can_be_saved_and_embedded() {
    let engine = Compositor::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let result = engine
        .composite("shot.webp", &solid(8, 8, [5, 5, 5, 255]), &image_options(None, 0.2, 1.0))
        .unwrap();

    let path = result.save_in(&dir.path().join("out")).unwrap();
    assert_eq!(path.file_name().unwrap(), "shot_processed.png");
    assert_eq!(std::fs::read(&path).unwrap(), result.png);
    assert!(result.data_uri().starts_with("data:image/png;base64,iVBORw0KGgo"));

    let source = SourceFile::read(&path).unwrap();
    assert_eq!(source.name, "shot_processed.png");
    assert_eq!(output_name(&source.name), "shot_processed_processed.png");
}
