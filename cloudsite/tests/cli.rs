use assert_cmd::Command;
use predicates::prelude::*;

/// Command with ambient credentials stripped, so tests are deterministic
/// regardless of the developer's environment.
fn cloudsite() -> Command {
    let mut cmd = Command::cargo_bin("cloudsite").expect("Binary exists");
    cmd.env_remove("AWS_ACCESS_KEY_ID")
        .env_remove("AWS_SECRET_ACCESS_KEY")
        .env_remove("AWS_REGION");
    cmd
}

#[test]
fn create_site_requires_a_domain() {
    cloudsite()
        .arg("create-site")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--domain"));
}

#[test]
fn create_site_fails_fast_without_credentials() {
    cloudsite()
        .args(["create-site", "--domain", "example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("AWS_ACCESS_KEY_ID"));
}

#[test]
fn create_site_dry_run_prints_the_template() {
    cloudsite()
        .args([
            "create-site",
            "--domain",
            "example.com",
            "--access-key",
            "AKIAFAKE",
            "--secret-key",
            "fake-secret",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("AWSTemplateFormatVersion")
                .and(predicate::str::contains("SiteBucket"))
                .and(predicate::str::contains("DnsRecords").not()),
        );
}

#[test]
fn create_site_dry_run_with_dns_includes_dns_records() {
    cloudsite()
        .args([
            "create-site",
            "--domain",
            "www.example.com",
            "--access-key",
            "AKIAFAKE",
            "--secret-key",
            "fake-secret",
            "--dns",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("DnsRecords"));
}

#[test]
fn create_site_rejects_an_invalid_domain() {
    cloudsite()
        .args([
            "create-site",
            "--domain",
            "Not-A-Domain",
            "--access-key",
            "AKIAFAKE",
            "--secret-key",
            "fake-secret",
            "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid site domain"));
}

#[test]
fn sync_bucket_requires_a_bucket() {
    cloudsite()
        .arg("sync-bucket")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--bucket"));
}

#[test]
fn sync_bucket_fails_fast_without_credentials() {
    cloudsite()
        .args(["sync-bucket", "--bucket", "example.com", "--dir", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("AWS_ACCESS_KEY_ID"));
}

#[test]
fn sync_bucket_requires_exactly_one_file_map_source() {
    cloudsite()
        .args([
            "sync-bucket",
            "--bucket",
            "example.com",
            "--access-key",
            "AKIAFAKE",
            "--secret-key",
            "fake-secret",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "exactly one of --dir and --file-maps",
        ));

    cloudsite()
        .args([
            "sync-bucket",
            "--bucket",
            "example.com",
            "--dir",
            ".",
            "--file-maps",
            "maps.yaml",
            "--access-key",
            "AKIAFAKE",
            "--secret-key",
            "fake-secret",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "exactly one of --dir and --file-maps",
        ));
}
