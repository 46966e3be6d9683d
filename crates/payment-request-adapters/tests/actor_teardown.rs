mod common;

use payment_request_core::{
    ChildTransport, PaymentError, PaymentOptions, PromiseState, RequestState,
};

use common::{
    accepted_show, donation_details, donation_method_data, manual_bridge, payer_name_options, pump,
};

#[test]
fn content_crash_purges_orphaned_privileged_records() {
    let (mut bridge, ui) = manual_bridge();
    let id = bridge
        .content_mut()
        .construct(&donation_method_data(), &donation_details(), payer_name_options())
        .expect("construct");
    let accept = bridge
        .content_mut()
        .handle(&id)
        .expect("handle")
        .show()
        .expect("show");
    pump(&mut bridge);
    assert_eq!(bridge.chrome().service().enumerate().len(), 1);

    bridge.content_mut().crash();
    assert!(matches!(
        accept.state(),
        PromiseState::Rejected(PaymentError::Abort(_))
    ));
    pump(&mut bridge);
    assert!(bridge.chrome().service().enumerate().is_empty());
    assert_eq!(bridge.chrome().actor_count(), 0);

    // a late answer from the sheet finds nobody and is dropped
    ui.respond(accepted_show(&id, "VISA", "Bill A. Pacheco"))
        .expect("post late answer");
    pump(&mut bridge);
    assert!(accept.fulfilled().is_none());
}

#[test]
fn chrome_shutdown_rejects_outstanding_content_promises() {
    let (mut bridge, _ui) = manual_bridge();
    let id = bridge
        .content_mut()
        .construct(&donation_method_data(), &donation_details(), PaymentOptions::default())
        .expect("construct");
    let result = bridge
        .content_mut()
        .handle(&id)
        .expect("handle")
        .can_make_payment()
        .expect("can make");
    pump(&mut bridge);

    bridge.chrome_mut().destroy_actors();
    assert!(bridge.chrome().service().enumerate().is_empty());
    pump(&mut bridge);

    assert!(matches!(
        result.state(),
        PromiseState::Rejected(PaymentError::Abort(_))
    ));
    let child = bridge.content().manager().child().expect("child actor");
    assert!(child.is_destroyed());
    assert!(matches!(
        bridge.content_mut().manager_mut().can_make_payment(&id),
        Err(PaymentError::NotInitialized)
    ));

    // the next request opens a fresh channel
    let next = bridge
        .content_mut()
        .construct(&donation_method_data(), &donation_details(), PaymentOptions::default())
        .expect("construct again");
    pump(&mut bridge);
    assert_eq!(bridge.chrome().actor_count(), 1);
    assert!(bridge.chrome().service().get_by_id(&next).is_some());
    assert_eq!(
        bridge.content().manager().child().map(|c| c.channel_id()),
        Some(2)
    );
}

#[test]
fn malformed_frame_tears_the_channel_down() {
    let (mut bridge, _ui) = manual_bridge();
    let id = bridge
        .content_mut()
        .construct(&donation_method_data(), &donation_details(), PaymentOptions::default())
        .expect("construct");
    let accept = bridge
        .content_mut()
        .handle(&id)
        .expect("handle")
        .show()
        .expect("show");
    pump(&mut bridge);

    bridge
        .content()
        .manager()
        .child()
        .expect("child actor")
        .transport()
        .send(b"garbage".to_vec())
        .expect("raw send");
    pump(&mut bridge);

    assert_eq!(bridge.chrome().actor_count(), 0);
    assert!(bridge.chrome().service().enumerate().is_empty());
    assert!(matches!(
        accept.state(),
        PromiseState::Rejected(PaymentError::Abort(_))
    ));
    assert_eq!(
        bridge.content().manager().get_by_internal_id(&id).map(|r| r.state()),
        Some(RequestState::Closed)
    );
}

#[test]
fn released_request_aborts_the_open_sheet() {
    let (mut bridge, ui) = manual_bridge();
    let id = bridge
        .content_mut()
        .construct(&donation_method_data(), &donation_details(), PaymentOptions::default())
        .expect("construct");
    let accept = bridge
        .content_mut()
        .handle(&id)
        .expect("handle")
        .show()
        .expect("show");
    bridge
        .content_mut()
        .manager_mut()
        .release(&id)
        .expect("release");
    assert!(accept.rejected_error().is_some());
    pump(&mut bridge);

    let calls = ui.calls().expect("calls");
    assert_eq!(calls.len(), 2);
    // the Delete that followed tore the privileged side down too
    assert!(bridge.chrome().service().enumerate().is_empty());
    assert_eq!(bridge.chrome().actor_count(), 0);
}
