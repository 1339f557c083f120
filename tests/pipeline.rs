use std::fs;
use std::path::PathBuf;
use std::process::Command;

use pnm_stencil::{pnm, run, ChannelMode, Error, FilterConfig, Image};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pnm_stencil_it_{}_{name}", std::process::id()))
}

fn gradient(width: usize, height: usize, mode: ChannelMode) -> Image {
    let channels = mode.channels();
    let mut samples = Vec::with_capacity(width * height * channels);
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                samples.push(((x * 31 + y * 17 + c * 59) % 256) as u8);
            }
        }
    }
    Image::new(width, height, mode, 255, samples).unwrap()
}

#[test]
fn smooth_uniform_4x4_end_to_end() {
    let input = temp_path("uniform_in.pgm");
    let output = temp_path("uniform_out.pgm");
    pnm::save(&input, &Image::filled(4, 4, ChannelMode::Gray, 100).unwrap()).unwrap();

    run(&input, &output, &["smooth"], &FilterConfig::default().with_workers(3)).unwrap();

    let bytes = fs::read(&output).unwrap();
    let mut expected = b"P5\n4 4\n255\n".to_vec();
    expected.extend_from_slice(&[100; 16]);
    assert_eq!(bytes, expected);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn worker_count_does_not_change_output_file() {
    let input = temp_path("gradient_in.ppm");
    pnm::save(&input, &gradient(7, 5, ChannelMode::Rgb)).unwrap();

    let chain = ["blur", "sharpen", "emboss"];
    let mut outputs = Vec::new();
    for workers in [1, 2, 6, 35] {
        let output = temp_path(&format!("gradient_out_{workers}.ppm"));
        run(&input, &output, &chain, &FilterConfig::default().with_workers(workers)).unwrap();
        outputs.push(fs::read(&output).unwrap());
        fs::remove_file(&output).unwrap();
    }
    fs::remove_file(&input).unwrap();

    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn unknown_filter_writes_nothing() {
    let input = temp_path("reject_in.pgm");
    pnm::save(&input, &gradient(5, 5, ChannelMode::Gray)).unwrap();

    for chain in [
        vec!["nonexistent"],
        vec!["blur", "nonexistent"],
        vec!["blur", "smooth", "nonexistent"],
    ] {
        let output = temp_path("reject_out.pgm");
        let result = run(&input, &output, &chain, &FilterConfig::default().with_workers(4));
        assert!(matches!(result, Err(Error::InvalidFilterName { .. })), "{chain:?}");
        assert!(!output.exists(), "{chain:?} produced output");
    }
    fs::remove_file(&input).unwrap();
}

#[test]
fn missing_input_is_io_error() {
    let result = run(
        &temp_path("absent.pgm"),
        &temp_path("absent_out.pgm"),
        &["smooth"],
        &FilterConfig::default(),
    );
    assert!(matches!(result, Err(Error::Io { .. })));
}

#[test]
fn cli_exit_codes() {
    let bin = env!("CARGO_BIN_EXE_pnm-stencil");
    let input = temp_path("cli_in.pgm");
    let output = temp_path("cli_out.pgm");
    pnm::save(&input, &gradient(6, 6, ChannelMode::Gray)).unwrap();

    let status = Command::new(bin)
        .arg(&input)
        .arg(&output)
        .args(["blur", "sharpen", "--workers", "4"])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(output.exists());
    fs::remove_file(&output).unwrap();

    let status = Command::new(bin).arg(&input).arg(&output).status().unwrap();
    assert_eq!(status.code(), Some(Error::InvalidArgumentCount.exit_code()));

    let status = Command::new(bin)
        .arg(&input)
        .arg(&output)
        .arg("nonexistent")
        .status()
        .unwrap();
    let unknown = Error::InvalidFilterName {
        name: "nonexistent".into(),
    };
    assert_eq!(status.code(), Some(unknown.exit_code()));
    assert!(!output.exists());

    let status = Command::new(bin)
        .arg(temp_path("cli_absent.pgm"))
        .arg(&output)
        .arg("smooth")
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(101));

    fs::remove_file(&input).unwrap();
}
