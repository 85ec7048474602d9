// tests/properties.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proptest::prelude::*;

use niftymic_pipeline::fs::mock::MockFileSystem;
use niftymic_pipeline::fs::FileSystem;
use niftymic_pipeline::stages::toolset::RECONSTRUCT_SUBCOMMAND;
use niftymic_pipeline::stages::{reconstruct_volume, ReconstructionParams, StageEnv};
use niftymic_test_utils::builders::{job_with, test_toolset};
use niftymic_test_utils::fake_runner::FakeRunner;

// Strategy for a set of distinct image stems.
fn stems(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set("[a-z]{1,6}", 1..=max).prop_map(|s| s.into_iter().collect())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("building test runtime")
}

/// Invocation of the reconstructor for `images`/`masks` in the given order.
fn reconstruct_args(images: &[PathBuf], masks: &[PathBuf]) -> Vec<String> {
    let fs = MockFileSystem::new();
    let runner = FakeRunner::new(Arc::new(fs.clone()));
    let tools = test_toolset();
    let env = StageEnv {
        runner: &runner,
        fs: &fs,
        tools: &tools,
    };

    runtime()
        .block_on(reconstruct_volume(
            env,
            images,
            masks,
            Path::new("/data/job"),
            Path::new("/data/job/output.nii.gz"),
            &ReconstructionParams::default(),
        ))
        .expect("fake reconstruction succeeds");

    let cmds = runner.commands_for(RECONSTRUCT_SUBCOMMAND);
    assert_eq!(cmds.len(), 1);
    cmds[0].args.clone()
}

proptest! {
    #[test]
    fn repeated_scans_never_duplicate_artifacts(
        names in stems(8),
        scans in 1..5usize,
    ) {
        let fs = MockFileSystem::new();
        for name in &names {
            fs.add_file(format!("/data/job/{name}.nii"), b"".to_vec());
            fs.add_file(format!("/data/job/masks/{name}_mask.nii.gz"), b"".to_vec());
        }
        let runner = Arc::new(FakeRunner::new(Arc::new(fs.clone()) as Arc<dyn FileSystem>));
        let mut job = job_with(Path::new("/data/job"), &[], runner, Arc::new(fs.clone()));

        for _ in 0..scans {
            job.load_existing_files().unwrap();
        }

        let unique: BTreeSet<_> = job.intermediate_images().iter().collect();
        prop_assert_eq!(unique.len(), job.intermediate_images().len());
        prop_assert_eq!(job.intermediate_images().len(), names.len());
        prop_assert_eq!(job.mask_images().len(), names.len());
    }

    #[test]
    fn reconstruction_command_ignores_input_order(
        names in stems(6),
        seed in any::<u64>(),
    ) {
        let images: Vec<PathBuf> = names.iter().map(|n| PathBuf::from(format!("/data/job/{n}.nii"))).collect();
        let masks: Vec<PathBuf> = names
            .iter()
            .map(|n| PathBuf::from(format!("/data/job/masks/{n}_mask.nii.gz")))
            .collect();

        // Deterministic shuffle from the seed.
        let mut shuffled_images = images.clone();
        let mut shuffled_masks = masks.clone();
        let len = shuffled_images.len();
        for i in 0..len {
            let j = ((seed >> (i % 32)) as usize + i * 7) % len;
            shuffled_images.swap(i, j);
            shuffled_masks.swap(len - 1 - i, j);
        }

        prop_assert_eq!(
            reconstruct_args(&images, &masks),
            reconstruct_args(&shuffled_images, &shuffled_masks)
        );
    }
}
