//
// reface_workflows.rs
// Dicom-Reface-rs
//
// Integration-style tests covering protocol scrubbing, window carry-over and full pipeline runs against a fake de-facing tool.
//
// Thales Matheus Mendonça Santos - November 2025

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{open_file, FileDicomObject, FileMetaTableBuilder};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use dicom_reface::classifier::ImageType;
use dicom_reface::dicom_access::{
    ElementAccess, PROTOCOL_NAME, SERIES_DESCRIPTION, WINDOW_CENTER,
    WINDOW_CENTER_WIDTH_EXPLANATION, WINDOW_WIDTH,
};
use dicom_reface::error::RefaceError;
use dicom_reface::pipeline::{run_pipeline, ImageTypeSource, PipelineConfig};
use dicom_reface::scrub::scrub_directory;
use dicom_reface::staging::{NIFTI_DIR, REFACED_NIFTI_DIR};
use dicom_reface::tool::{DefaceTool, ToolExit};
use dicom_reface::window::{apply_window, capture_reference_window, WindowSpec};
use tempfile::tempdir;

const SOP_CLASS: &str = "1.2.840.10008.5.1.4.1.1.4";

fn write_dicom(path: &Path, fields: &[(Tag, VR, &str)]) {
    // Tiny MR instance with only the attributes a test cares about.
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    let instance_uid = format!("1.2.826.0.1.3680043.2.1125.{}", fields.len() + 1);

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid(SOP_CLASS)
        .media_storage_sop_instance_uid(instance_uid.as_str())
        .build()
        .expect("meta");

    let mut obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    obj.put(DataElement::new(
        Tag(0x0008, 0x0016),
        VR::UI,
        PrimitiveValue::from(SOP_CLASS),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0060),
        VR::CS,
        PrimitiveValue::from("MR"),
    ));
    for (tag, vr, value) in fields {
        obj.put(DataElement::new(*tag, *vr, PrimitiveValue::from(*value)));
    }
    obj.write_to_file(path).expect("write test dicom");
}

fn read_tag(path: &Path, tag: Tag) -> Option<String> {
    open_file(path).expect("open dicom").element_str(tag)
}

fn has_tag(path: &Path, tag: Tag) -> bool {
    open_file(path).expect("open dicom").has_element(tag)
}

#[test]
fn scrub_clears_present_descriptors_and_flattens() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("scrubbed");

    write_dicom(
        &input.join("series1").join("IM0001.dcm"),
        &[
            (SERIES_DESCRIPTION, VR::LO, "AX T2 FLAIR "),
            (PROTOCOL_NAME, VR::LO, "DOE_BRAIN_PROTO "),
        ],
    );
    write_dicom(
        &input.join("IM0002"),
        &[(SERIES_DESCRIPTION, VR::LO, "SAG MPRAGE")],
    );
    fs::write(input.join("notes.txt"), b"not dicom").expect("write");
    fs::write(input.join("fake.dcm"), b"not dicom either").expect("write");

    let summary = scrub_directory(&input, &output).expect("scrub");
    assert_eq!(summary.written, 2);
    assert_eq!(summary.cleared, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.collisions, 0);

    let first = output.join("IM0001.dcm");
    assert_eq!(read_tag(&first, SERIES_DESCRIPTION).as_deref(), Some(""));
    assert_eq!(read_tag(&first, PROTOCOL_NAME).as_deref(), Some(""));

    let second = output.join("IM0002");
    assert_eq!(read_tag(&second, SERIES_DESCRIPTION).as_deref(), Some(""));
    assert!(!has_tag(&second, PROTOCOL_NAME));

    assert!(!output.join("notes.txt").exists());
    assert!(!output.join("fake.dcm").exists());
    assert!(!output.join("series1").exists());

    // The source series is left untouched.
    assert_eq!(
        read_tag(&input.join("IM0002"), SERIES_DESCRIPTION).as_deref(),
        Some("SAG MPRAGE")
    );
}

#[test]
fn scrub_counts_name_collisions_when_flattening() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("scrubbed");

    write_dicom(
        &input.join("series1").join("IM0001"),
        &[(SERIES_DESCRIPTION, VR::LO, "SERIES_1")],
    );
    write_dicom(
        &input.join("series2").join("IM0001"),
        &[(PROTOCOL_NAME, VR::LO, "SERIES_2")],
    );

    let summary = scrub_directory(&input, &output).expect("scrub");
    assert_eq!(summary.written, 2);
    assert_eq!(summary.collisions, 1);
    assert_eq!(fs::read_dir(&output).expect("list").count(), 1);

    // Rerunning into the same folder is not a collision.
    let again = scrub_directory(&input.join("series1"), &output).expect("rescrub");
    assert_eq!(again.collisions, 0);
}

#[test]
fn scrubbing_twice_equals_scrubbing_once() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let once = dir.path().join("once");
    let twice = dir.path().join("twice");

    write_dicom(
        &input.join("IM0001"),
        &[(PROTOCOL_NAME, VR::LO, "RESEARCH_PROTO_7 ")],
    );

    scrub_directory(&input, &once).expect("first scrub");
    scrub_directory(&once, &twice).expect("second scrub");

    for path in [once.join("IM0001"), twice.join("IM0001")] {
        assert_eq!(read_tag(&path, PROTOCOL_NAME).as_deref(), Some(""));
        assert!(!has_tag(&path, SERIES_DESCRIPTION));
    }
}

#[test]
fn capture_takes_first_file_with_center_and_width() {
    let dir = tempdir().expect("tempdir");
    write_dicom(&dir.path().join("01.dcm"), &[(WINDOW_CENTER, VR::DS, "40")]);
    write_dicom(
        &dir.path().join("02.dcm"),
        &[
            (WINDOW_CENTER, VR::DS, "35"),
            (WINDOW_WIDTH, VR::DS, "2000"),
            (WINDOW_CENTER_WIDTH_EXPLANATION, VR::LO, "BRAINWIN"),
        ],
    );
    write_dicom(
        &dir.path().join("03.dcm"),
        &[(WINDOW_CENTER, VR::DS, "10"), (WINDOW_WIDTH, VR::DS, "20")],
    );

    let spec = capture_reference_window(dir.path()).expect("capture");
    assert_eq!(
        spec,
        WindowSpec {
            center: Some("35".into()),
            width: Some("2000".into()),
            explanation: Some("BRAINWIN".into()),
        }
    );
}

#[test]
fn capture_without_window_tags_is_all_absent() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("IM0001");
    write_dicom(&file, &[(WINDOW_CENTER, VR::DS, "40")]);

    let single = capture_reference_window(&file).expect("file capture");
    assert_eq!(single.center.as_deref(), Some("40"));
    assert_eq!(single.width, None);

    let from_dir = capture_reference_window(dir.path()).expect("dir capture");
    assert_eq!(from_dir, WindowSpec::default());
}

#[test]
fn apply_window_overwrites_every_output_file() {
    let dir = tempdir().expect("tempdir");
    let a = dir.path().join("IM0001");
    let b = dir.path().join("nested").join("IM0002");
    write_dicom(&a, &[]);
    write_dicom(
        &b,
        &[
            (WINDOW_CENTER, VR::DS, "99"),
            (WINDOW_WIDTH, VR::DS, "99"),
            (WINDOW_CENTER_WIDTH_EXPLANATION, VR::LO, "TOOLWIN1"),
        ],
    );
    fs::write(dir.path().join("log.txt"), b"log").expect("write");

    let spec = WindowSpec {
        center: Some("35".into()),
        width: Some("2000".into()),
        explanation: None,
    };
    let summary = apply_window(dir.path(), &spec);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.failed, 0);

    for path in [&a, &b] {
        assert_eq!(read_tag(path, WINDOW_CENTER).as_deref(), Some("35"));
        assert_eq!(read_tag(path, WINDOW_WIDTH).as_deref(), Some("2000"));
    }
    // Explanation is only written when one was captured.
    assert!(!has_tag(&a, WINDOW_CENTER_WIDTH_EXPLANATION));
    assert_eq!(
        read_tag(&b, WINDOW_CENTER_WIDTH_EXPLANATION).as_deref(),
        Some("TOOLWIN1")
    );
}

#[test]
fn incomplete_window_leaves_output_untouched() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("IM0001");
    write_dicom(
        &file,
        &[(WINDOW_CENTER, VR::DS, "99"), (WINDOW_WIDTH, VR::DS, "99")],
    );

    let center_only = WindowSpec {
        center: Some("35".into()),
        width: None,
        explanation: Some("BRAINWIN".into()),
    };
    let width_only = WindowSpec {
        center: None,
        width: Some("2000".into()),
        explanation: None,
    };
    for spec in [center_only, width_only] {
        let summary = apply_window(dir.path(), &spec);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(read_tag(&file, WINDOW_CENTER).as_deref(), Some("99"));
        assert_eq!(read_tag(&file, WINDOW_WIDTH).as_deref(), Some("99"));
        assert!(!has_tag(&file, WINDOW_CENTER_WIDTH_EXPLANATION));
    }
}

/// Stand-in for mri_reface: records its invocation and drops a typical output set.
struct FakeTool {
    code: i32,
    calls: RefCell<Vec<(PathBuf, ImageType, Vec<String>)>>,
}

impl FakeTool {
    fn exiting_with(code: i32) -> Self {
        Self {
            code,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl DefaceTool for FakeTool {
    fn run(
        &self,
        input: &Path,
        output: &Path,
        image_type: ImageType,
        extra_args: &[String],
    ) -> dicom_reface::Result<ToolExit> {
        self.calls
            .borrow_mut()
            .push((input.to_path_buf(), image_type, extra_args.to_vec()));
        fs::create_dir_all(output)?;
        for name in ["sub_deFaced.nii", "sub_Warp.nii", "sub.nii"] {
            fs::write(output.join(name), b"nifti")?;
        }
        write_dicom(
            &output.join("refaced_dicom").join("IM0001"),
            &[(WINDOW_CENTER, VR::DS, "99"), (WINDOW_WIDTH, VR::DS, "99")],
        );
        Ok(ToolExit { code: self.code })
    }
}

fn pipeline_fixture(root: &Path, body_part: &str) -> PipelineConfig {
    let input = root.join("input");
    write_dicom(
        &input.join("IM0001"),
        &[
            (SERIES_DESCRIPTION, VR::LO, "PIB DYNAMIC "),
            (WINDOW_CENTER, VR::DS, "35"),
            (WINDOW_WIDTH, VR::DS, "2000"),
        ],
    );

    let csv = root.join("scans.csv");
    fs::write(
        &csv,
        format!(
            "experiment,scan,0018_0015,0008_0060,0054_0016,labels1\n\
             PET_01,1,{body_part},PET,AV45,\n\
             PET_01,2,{body_part},PET,FDG,\n"
        ),
    )
    .expect("write csv");

    let mut config = PipelineConfig::new(
        &input,
        root.join("output"),
        ImageTypeSource::Table {
            csv,
            experiment: "PET_01".into(),
            scan: "1".into(),
        },
    );
    config.scrub_dir = Some(root.join("input_scrubbed"));
    config.tool_args = vec!["-saveQCRenders".into(), "0".into()];
    config
}

#[test]
fn pipeline_runs_all_steps_in_order() {
    let dir = tempdir().expect("tempdir");
    let config = pipeline_fixture(dir.path(), "Head");
    let tool = FakeTool::exiting_with(0);

    let summary = run_pipeline(&config, &tool).expect("pipeline");
    assert_eq!(summary.image_type, ImageType::Pib);

    let calls = tool.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, dir.path().join("input_scrubbed"));
    assert_eq!(calls[0].1, ImageType::Pib);
    assert_eq!(calls[0].2, ["-saveQCRenders", "0"]);

    let scrubbed = dir.path().join("input_scrubbed").join("IM0001");
    assert_eq!(read_tag(&scrubbed, SERIES_DESCRIPTION).as_deref(), Some(""));

    let output = dir.path().join("output");
    let produced = output.join("refaced_dicom").join("IM0001");
    assert_eq!(read_tag(&produced, WINDOW_CENTER).as_deref(), Some("35"));
    assert_eq!(read_tag(&produced, WINDOW_WIDTH).as_deref(), Some("2000"));

    assert_eq!(summary.staging.refaced, 2);
    assert_eq!(summary.staging.nifti, 1);
    assert!(output.join(REFACED_NIFTI_DIR).join("sub_deFaced.nii").exists());
    assert!(output.join(REFACED_NIFTI_DIR).join("sub_Warp.nii").exists());
    assert!(output.join(NIFTI_DIR).join("sub.nii").exists());
    assert_eq!(summary.scrub.map(|s| s.written), Some(1));
}

#[test]
fn reference_without_window_keeps_tool_values() {
    let dir = tempdir().expect("tempdir");
    let config = pipeline_fixture(dir.path(), "head");
    // Replace the reference series with one that carries no window.
    write_dicom(
        &dir.path().join("input").join("IM0001"),
        &[(SERIES_DESCRIPTION, VR::LO, "PIB DYNAMIC ")],
    );
    let tool = FakeTool::exiting_with(0);

    let summary = run_pipeline(&config, &tool).expect("pipeline");
    assert_eq!(summary.window, Some(WindowSpec::default()));
    assert_eq!(summary.windowed.map(|w| w.updated), Some(0));

    let produced = dir.path().join("output").join("refaced_dicom").join("IM0001");
    assert_eq!(read_tag(&produced, WINDOW_CENTER).as_deref(), Some("99"));
    assert_eq!(read_tag(&produced, WINDOW_WIDTH).as_deref(), Some("99"));
}

#[test]
fn failing_tool_stops_before_window_and_staging() {
    let dir = tempdir().expect("tempdir");
    let config = pipeline_fixture(dir.path(), "brain");
    let tool = FakeTool::exiting_with(2);

    let err = run_pipeline(&config, &tool).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RefaceError>(),
        Some(RefaceError::ExternalToolFailure { code: 2 })
    ));

    let output = dir.path().join("output");
    let produced = output.join("refaced_dicom").join("IM0001");
    assert_eq!(read_tag(&produced, WINDOW_CENTER).as_deref(), Some("99"));
    assert!(!output.join(REFACED_NIFTI_DIR).exists());
    assert!(output.join("sub_deFaced.nii").exists());
}

#[test]
fn unsupported_body_part_never_reaches_the_tool() {
    let dir = tempdir().expect("tempdir");
    let config = pipeline_fixture(dir.path(), "NECK");
    let tool = FakeTool::exiting_with(0);

    let err = run_pipeline(&config, &tool).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RefaceError>(),
        Some(RefaceError::UnsupportedBodyPart(part)) if part == "NECK"
    ));
    assert!(tool.calls.borrow().is_empty());
    assert!(!dir.path().join("input_scrubbed").exists());
}
