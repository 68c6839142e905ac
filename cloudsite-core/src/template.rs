//! Infrastructure template synthesis for a static website.
//!
//! Produces a CloudFormation-style JSON document describing everything one
//! site needs: a website-configured bucket named after the domain, a public
//! read policy, a CDN distribution aliased to the domain, a scoped deploy
//! user with an access key, and (optionally) DNS alias records. The document
//! is returned as a [`serde_json::Value`] so callers can pretty-print it for
//! dry runs or serialize it for submission.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// Alias hosted-zone id the CDN service uses for all distributions.
const CDN_ALIAS_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// Describes the site to synthesize a template for.
#[derive(Debug, Clone)]
pub struct SiteSpec {
    /// Fully qualified domain the site is served under, e.g. `www.example.com`.
    pub domain: String,
    /// Also provision DNS alias records in the domain's hosted zone.
    pub dns: bool,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("not a valid site domain {domain:?}: {reason}")]
    InvalidDomain { domain: String, reason: &'static str },
}

/// Validates that `domain` is a plausible fully qualified site domain:
/// lowercase, dotted, and made of `[a-z0-9-]` labels.
pub fn validate_domain(domain: &str) -> Result<(), TemplateError> {
    let invalid = |reason| TemplateError::InvalidDomain {
        domain: domain.to_string(),
        reason,
    };
    if domain.is_empty() {
        return Err(invalid("domain is empty"));
    }
    if !domain.contains('.') {
        return Err(invalid("expected a fully qualified domain with at least one dot"));
    }
    if !domain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(invalid(
            "only lowercase letters, digits, dots and dashes are allowed",
        ));
    }
    for label in domain.split('.') {
        if label.is_empty() {
            return Err(invalid("empty label (leading, trailing or doubled dot)"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("labels must not start or end with a dash"));
        }
    }
    Ok(())
}

/// Derives the stack name for a domain: non-alphanumeric runs become dashes,
/// suffixed with `-static-site`. `example.com` maps to `example-com-static-site`.
pub fn stack_name(domain: &str) -> String {
    let mut name = String::with_capacity(domain.len());
    let mut previous_dash = false;
    for c in domain.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c);
            previous_dash = false;
        } else if !previous_dash {
            name.push('-');
            previous_dash = true;
        }
    }
    let trimmed = name.trim_matches('-');
    format!("{trimmed}-static-site")
}

/// The root zone of a domain: its last two labels. `www.example.com` lives in
/// the `example.com` zone; an apex domain is its own zone.
pub fn root_zone(domain: &str) -> String {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() <= 2 {
        domain.to_string()
    } else {
        labels[labels.len() - 2..].join(".")
    }
}

/// Synthesizes the full template document for `spec`.
pub fn synthesize(spec: &SiteSpec) -> Result<Value, TemplateError> {
    validate_domain(&spec.domain)?;
    let domain = &spec.domain;

    let bucket_arn = json!({"Fn::Join": ["", ["arn:aws:s3:::", {"Ref": "SiteBucket"}]]});
    let bucket_objects_arn =
        json!({"Fn::Join": ["", ["arn:aws:s3:::", {"Ref": "SiteBucket"}, "/*"]]});
    let distribution_domain = json!({"Fn::GetAtt": ["SiteDistribution", "DomainName"]});

    let mut resources = json!({
        "SiteBucket": {
            "Type": "AWS::S3::Bucket",
            "Properties": {
                "BucketName": domain,
                "WebsiteConfiguration": {
                    "IndexDocument": "index.html",
                    "ErrorDocument": "error.html"
                }
            }
        },
        "BucketPolicy": {
            "Type": "AWS::S3::BucketPolicy",
            "Properties": {
                "Bucket": {"Ref": "SiteBucket"},
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Sid": "PublicRead",
                        "Effect": "Allow",
                        "Principal": "*",
                        "Action": ["s3:GetObject"],
                        "Resource": [bucket_objects_arn.clone()]
                    }]
                }
            }
        },
        "SiteDistribution": {
            "Type": "AWS::CloudFront::Distribution",
            "Properties": {
                "DistributionConfig": {
                    "Enabled": true,
                    "Aliases": [domain],
                    "DefaultRootObject": "index.html",
                    "Origins": [{
                        "Id": "site-bucket-website",
                        "DomainName": {"Fn::Join": ["", [
                            {"Ref": "SiteBucket"},
                            ".s3-website-",
                            {"Ref": "AWS::Region"},
                            ".amazonaws.com"
                        ]]},
                        "CustomOriginConfig": {"OriginProtocolPolicy": "http-only"}
                    }],
                    "DefaultCacheBehavior": {
                        "TargetOriginId": "site-bucket-website",
                        "ViewerProtocolPolicy": "allow-all",
                        "ForwardedValues": {"QueryString": false}
                    }
                }
            }
        },
        "DeployUser": {
            "Type": "AWS::IAM::User"
        },
        "DeployPolicy": {
            "Type": "AWS::IAM::Policy",
            "Properties": {
                "PolicyName": "site-deploy",
                "Users": [{"Ref": "DeployUser"}],
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [
                        {
                            "Effect": "Allow",
                            "Action": ["s3:PutObject", "s3:DeleteObject", "s3:GetObject"],
                            "Resource": [bucket_objects_arn]
                        },
                        {
                            "Effect": "Allow",
                            "Action": ["s3:ListBucket"],
                            "Resource": [bucket_arn]
                        }
                    ]
                }
            }
        },
        "DeployKey": {
            "Type": "AWS::IAM::AccessKey",
            "Properties": {"UserName": {"Ref": "DeployUser"}}
        }
    });

    if spec.dns {
        let zone = root_zone(domain);
        resources["DnsRecords"] = json!({
            "Type": "AWS::Route53::RecordSetGroup",
            "Properties": {
                "HostedZoneName": format!("{zone}."),
                "RecordSets": [{
                    "Name": format!("{domain}."),
                    "Type": "A",
                    "AliasTarget": {
                        "HostedZoneId": CDN_ALIAS_ZONE_ID,
                        "DNSName": distribution_domain.clone()
                    }
                }]
            }
        });
    }

    let template = json!({
        "AWSTemplateFormatVersion": "2010-09-09",
        "Description": format!("Static website for {domain}"),
        "Resources": resources,
        "Outputs": {
            "BucketName": {
                "Description": "Bucket holding the site files",
                "Value": {"Ref": "SiteBucket"}
            },
            "WebsiteUrl": {
                "Description": "URL the site is served under",
                "Value": {"Fn::Join": ["", ["http://", distribution_domain.clone()]]}
            },
            "DistributionId": {
                "Description": "Id of the CDN distribution",
                "Value": {"Ref": "SiteDistribution"}
            },
            "DistributionDomain": {
                "Description": "Domain name of the CDN distribution",
                "Value": distribution_domain
            },
            "AccessKeyId": {
                "Description": "Access key of the scoped deploy user",
                "Value": {"Ref": "DeployKey"}
            },
            "SecretAccessKey": {
                "Description": "Secret key of the scoped deploy user",
                "Value": {"Fn::GetAtt": ["DeployKey", "SecretAccessKey"]}
            }
        }
    });
    debug!(domain = %domain, dns = spec.dns, "synthesized site template");
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(domain: &str, dns: bool) -> SiteSpec {
        SiteSpec {
            domain: domain.to_string(),
            dns,
        }
    }

    #[test]
    fn synthesize_names_bucket_after_domain() {
        let template = synthesize(&spec("example.com", false)).unwrap();
        assert_eq!(
            template["Resources"]["SiteBucket"]["Properties"]["BucketName"],
            "example.com"
        );
    }

    #[test]
    fn dns_records_present_only_when_requested() {
        let without = synthesize(&spec("www.example.com", false)).unwrap();
        assert!(without["Resources"].get("DnsRecords").is_none());

        let with = synthesize(&spec("www.example.com", true)).unwrap();
        let records = &with["Resources"]["DnsRecords"];
        assert_eq!(records["Type"], "AWS::Route53::RecordSetGroup");
        assert_eq!(records["Properties"]["HostedZoneName"], "example.com.");
        assert_eq!(
            records["Properties"]["RecordSets"][0]["Name"],
            "www.example.com."
        );
    }

    #[test]
    fn outputs_cover_bucket_distribution_and_deploy_key() {
        let template = synthesize(&spec("example.com", false)).unwrap();
        let outputs = template["Outputs"].as_object().unwrap();
        for key in [
            "BucketName",
            "WebsiteUrl",
            "DistributionId",
            "DistributionDomain",
            "AccessKeyId",
            "SecretAccessKey",
        ] {
            assert!(outputs.contains_key(key), "missing output {key}");
        }
    }

    #[test]
    fn invalid_domains_are_rejected() {
        for domain in ["", "nodot", "Upper.com", "a..b", ".example.com", "-a.com", "a-.com"] {
            assert!(
                synthesize(&spec(domain, false)).is_err(),
                "expected {domain:?} to be rejected"
            );
        }
    }

    #[test]
    fn stack_name_is_dashed_and_suffixed() {
        assert_eq!(stack_name("example.com"), "example-com-static-site");
        assert_eq!(stack_name("www.example.com"), "www-example-com-static-site");
    }

    #[test]
    fn root_zone_keeps_last_two_labels() {
        assert_eq!(root_zone("example.com"), "example.com");
        assert_eq!(root_zone("www.example.com"), "example.com");
        assert_eq!(root_zone("a.b.example.com"), "example.com");
    }
}
