//! Chart package fixtures built in memory.

#![allow(dead_code)]

use std::io::Write;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder;

/// Build a `.tgz` in memory from a list of (path, content) pairs.
pub fn build_tgz(files: &[(&str, &[u8])]) -> Bytes {
    let mut tar_buf = Vec::new();
    {
        let mut builder = Builder::new(&mut tar_buf);
        for (path, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, *data).unwrap();
        }
        builder.finish().unwrap();
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_buf).unwrap();
    Bytes::from(encoder.finish().unwrap())
}

/// Chart package shaped like the upstream tomcat chart.
pub fn chart_package(name: &str, version: &str) -> Bytes {
    let chart_yaml = format!(
        r#"apiVersion: v1
name: {name}
version: {version}
appVersion: "7.0"
description: Deploy a basic tomcat application server with sidecar as web archive container
home: https://github.com/yahavb
icon: http://tomcat.apache.org/res/images/tomcat.png
maintainers:
  - name: yahavb
    email: ybiran@ananware.systems
"#
    );
    let values_yaml: &[u8] = b"replicaCount: 1\nimage:\n  tomcat:\n    repository: tomcat\n";
    let template: &[u8] = b"apiVersion: v1\nkind: Service\n";

    let chart_path = format!("{name}/Chart.yaml");
    let values_path = format!("{name}/values.yaml");
    let template_path = format!("{name}/templates/svc.yaml");

    build_tgz(&[
        (chart_path.as_str(), chart_yaml.as_bytes()),
        (values_path.as_str(), values_yaml),
        (template_path.as_str(), template),
    ])
}
