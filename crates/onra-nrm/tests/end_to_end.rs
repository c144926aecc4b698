//! End-to-end scenarios over the A--B--C line topology, driven through the
//! request handler with a scripted solver standing in for glpsol.
//!
//! The script routes by the `src`/`dst` params of the instance data and
//! turns infeasible as soon as any hop of its route shows up in the
//! `inuse_X` projection, which is exactly the contract the engine relies
//! on for channel exhaustion.

use onra_compile::{make_skeleton, Mode};
use onra_core::test_utils::line_topology;
use onra_core::topology::Topology;
use onra_nrm::engine::{Engine, EngineConfig, MAX_SEC_PATH_FIND, MAX_SEC_SOLVEC};
use onra_nrm::registry::Registry;
use onra_nrm::Handler;
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const FILE_KEY: &str = "line.xml";

const SOLVER_SCRIPT: &str = r##"#!/bin/sh
DATA=""; OUT=""
while [ $# -gt 0 ]; do
  case "$1" in
    --data) DATA="$2"; shift 2 ;;
    --output) OUT="$2"; shift 2 ;;
    *) shift ;;
  esac
done
CH=$(sed -n 's/^set AllChannels := \([A-Za-z0-9_]*\);$/\1/p' "$DATA" | head -n 1)
SRC=$(sed -n 's/^param src := \(.*\);$/\1/p' "$DATA" | head -n 1)
DST=$(sed -n 's/^param dst := \(.*\);$/\1/p' "$DATA" | head -n 1)
case "$SRC-$DST" in
  A_2-C_1) HOPS="A_2:B_1 B_1:B_4 B_4:C_1" ;;
  A_2-B_1) HOPS="A_2:B_1" ;;
  B_1-C_1) HOPS="B_1:B_4 B_4:C_1" ;;
  *) HOPS="" ;;
esac
if [ -z "$HOPS" ]; then
  echo "PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION"
  exit 0
fi
INUSE=$(sed -n '/param inuse_X/,$p' "$DATA")
for hop in $HOPS; do
  s=${hop%%:*}; d=${hop##*:}
  if printf '%s\n' "$INUSE" | grep -q "^\[$s,$CH,$d,$CH\] 1$"; then
    echo "PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION"
    exit 0
  fi
done
echo "INTEGER OPTIMAL SOLUTION FOUND"
for hop in $HOPS; do
  s=${hop%%:*}; d=${hop##*:}
  echo "# $s $CH $d $CH 1 1 0.1 0 0 0"
done
echo "PATH_COST = 1.2 (MINimum)" > "$OUT"
exit 0
"##;

fn install_solver(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("glpsol");
    fs::write(&path, SOLVER_SCRIPT).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn write_skeletons(topo: &Topology, glpk_dir: &Path) {
    let skel = glpk_dir.join("glpk");
    fs::create_dir_all(&skel).unwrap();
    for ch in topo.all_channels() {
        let name = format!("pf_{FILE_KEY}_{}", topo.channel(ch).full_no);
        let vt_file = skel.join(format!("{name}.vt.json"));
        let out = make_skeleton(
            topo,
            Mode::Pf,
            false,
            &[ch],
            &BTreeMap::new(),
            None,
            &vt_file,
        )
        .unwrap();
        fs::write(skel.join(format!("{name}.data")), &out.data).unwrap();
    }
}

fn make_handler(dir: &TempDir, db: bool) -> Handler {
    let topo = Arc::new(line_topology());
    let glpk_dir = dir.path().join("glpk");
    let store_path = dir.path().join("db/reserved.json");
    write_skeletons(&topo, &glpk_dir);
    let solver = install_solver(dir.path());
    let registry = if db {
        Registry::load_store(&topo, &store_path).unwrap()
    } else {
        Registry::new()
    };
    let engine = Engine::new(
        topo,
        BTreeMap::new(),
        EngineConfig {
            glpk_dir,
            topo_xml_key: FILE_KEY.to_string(),
            num_comps: 0,
            tmlim_pf: MAX_SEC_PATH_FIND,
            tmlim_solvec: MAX_SEC_SOLVEC,
            solver_binary: solver,
        },
    );
    Handler::new(engine, registry, store_path, db)
}

#[test]
fn pathfind_prefers_the_lowest_channel() {
    let dir = TempDir::new().unwrap();
    let handler = make_handler(&dir, false);
    let reply = handler.handle("pathfind -s A_2 -d C_1");
    assert!(reply.contains("go route"), "unexpected reply: {reply}");
    assert!(reply.contains("(WDM32_1)"));
    assert!(!reply.contains("(WDM32_2)"));
    // Nothing was committed.
    assert_eq!(handler.handle("query"), "No Reservation");
}

#[test]
fn reserve_exhausts_channels_then_refuses() {
    let dir = TempDir::new().unwrap();
    let handler = make_handler(&dir, false);

    let first = handler.handle("reserve -s A_2 -d C_1");
    assert!(first.contains("id=1, globalId=urn:uuid:"), "{first}");

    // The first channel is booked, so the second reserve lands on WDM32_2.
    let second = handler.handle("reserve -s A_2 -d C_1 -ch WDM32_1 WDM32_2");
    assert!(second.contains("id=2"), "{second}");
    let query = handler.handle("query -g 2");
    assert!(query.contains("(WDM32_2)"), "{query}");

    // Both channels exhausted: a client-visible no-route outcome.
    let third = handler.handle("reserve -s A_2 -d C_1");
    assert!(
        third.starts_with("PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION"),
        "{third}"
    );
    assert_eq!(handler.handle("query").matches("globalId").count(), 2);
}

#[test]
fn no_double_booking_on_the_same_tuple() {
    let dir = TempDir::new().unwrap();
    let handler = make_handler(&dir, false);
    handler.handle("reserve -s A_2 -d C_1 -ch WDM32_1");
    // Re-reserving the same tuple set on the same channel must fail.
    let reply = handler.handle("reserve -s A_2 -d C_1 -ch WDM32_1");
    assert!(reply.starts_with("PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION"));
}

#[test]
fn terminate_restores_the_projection() {
    let dir = TempDir::new().unwrap();
    let handler = make_handler(&dir, false);
    handler.handle("reserve -s A_2 -d C_1 -ch WDM32_1");
    assert!(handler
        .handle("reserve -s A_2 -d C_1 -ch WDM32_1")
        .starts_with("PROBLEM"));
    let reply = handler.handle("terminate -g 1");
    assert!(reply.contains("delete from memory: 1"), "{reply}");
    // The tuple set is free again.
    let again = handler.handle("reserve -s A_2 -d C_1 -ch WDM32_1");
    assert!(again.contains("globalId=urn:uuid:"), "{again}");
}

#[test]
fn terminate_all_then_rereserve_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let handler = make_handler(&dir, false);
    handler.handle("reserve -s A_2 -d C_1");
    let before = handler.handle("query -g 1");
    handler.handle("TERMINATEALL");
    assert_eq!(handler.handle("query"), "No Reservation");

    let reply = handler.handle("reserve -s A_2 -d C_1");
    assert!(reply.contains("id=1"), "{reply}");
    let after = handler.handle("query -g 1");
    let strip_ids = |s: &str| -> String {
        s.lines()
            .filter(|l| !l.contains("globalId"))
            .collect::<Vec<&str>>()
            .join("\n")
    };
    assert_eq!(strip_ids(&before), strip_ids(&after));
}

#[test]
fn ero_routes_through_the_named_port() {
    let dir = TempDir::new().unwrap();
    let handler = make_handler(&dir, false);
    let reply = handler.handle("pathfind -s A_2 -d C_1 -ero B_1");
    assert!(reply.contains("go route"), "{reply}");
    // B_1 appears exactly once along the path.
    let hits = reply
        .lines()
        .filter(|l| l.starts_with("B_1 "))
        .count();
    assert_eq!(hits, 1, "{reply}");
}

#[test]
fn bidi_reserve_carries_both_directions() {
    let dir = TempDir::new().unwrap();
    let handler = make_handler(&dir, false);
    let reply = handler.handle("reserve -s A_2 -d C_1 -bi");
    assert!(reply.contains("id=1"), "{reply}");
    let query = handler.handle("query -g 1");
    assert!(query.contains("go route"));
    assert!(query.contains("back route"));
    // The back path walks the twin pairs.
    assert!(query.contains("C_1"), "{query}");
    assert!(query.contains("B_2"), "{query}");
    // Both directions booked: the twin tuples are gone too.
    let reverse = handler.handle("reserve -s A_2 -d C_1 -ch WDM32_1");
    assert!(reverse.starts_with("PROBLEM"), "{reverse}");
}

#[test]
fn wdmsa_round_robins_across_calls() {
    let dir = TempDir::new().unwrap();
    let handler = make_handler(&dir, false);
    let first = handler.handle("reserve -s A_2 -d C_1 -wdmsa");
    assert!(first.contains("id=1"), "{first}");
    assert!(handler.handle("query -g 1").contains("(WDM32_1)"));
    let second = handler.handle("reserve -s A_2 -d C_1 -wdmsa");
    assert!(second.contains("id=2"), "{second}");
    assert!(handler.handle("query -g 2").contains("(WDM32_2)"));
    // Third call cycles back to WDM32_1, which is taken: exactly one
    // channel is tried, so the request fails instead of falling through.
    let third = handler.handle("reserve -s A_2 -d C_1 -wdmsa");
    assert!(third.starts_with("PROBLEM"), "{third}");
}

#[test]
fn write_db_survives_restart() {
    let dir = TempDir::new().unwrap();
    let (global_id, route_before) = {
        let handler = make_handler(&dir, false);
        let reply = handler.handle("reserve -s A_2 -d C_1");
        let global_id = reply
            .split("globalId=")
            .nth(1)
            .unwrap()
            .trim()
            .to_string();
        let db_reply = handler.handle("writeDB");
        assert!(db_reply.contains("1 entries written to the DB"), "{db_reply}");
        (global_id, handler.handle("query -g 1"))
    };

    // Restart with --db: the registry reloads and short ids restart at 1.
    let handler = make_handler(&dir, true);
    let after = handler.handle("query -g 1");
    assert!(after.contains(&global_id), "{after}");
    assert_eq!(route_before, after);

    // The reloaded projection still blocks the booked channel.
    let reply = handler.handle("reserve -s A_2 -d C_1 -ch WDM32_1");
    assert!(reply.starts_with("PROBLEM"), "{reply}");
}

#[test]
fn zero_hop_request_selects_nothing() {
    let dir = TempDir::new().unwrap();
    let handler = make_handler(&dir, false);
    let reply = handler.handle("pathfind -s A_1 -d A_1");
    assert!(reply.contains("go route"), "{reply}");
    assert!(reply.contains("<empty>"), "{reply}");
}
